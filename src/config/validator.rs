use crate::config::Config;
use crate::error::{KbSearchError, Result, ValidationError};

/// Smallest writer heap tantivy accepts for a single indexing thread
const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_engine(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(KbSearchError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.storage.database_file.trim().is_empty() {
            errors.push(ValidationError::new(
                "storage.database_file",
                "Database file name cannot be empty",
            ));
        }

        if config.storage.index_dir.trim().is_empty() {
            errors.push(ValidationError::new(
                "storage.index_dir",
                "Index directory name cannot be empty",
            ));
        }

        if config.storage.pool_size == 0 {
            errors.push(ValidationError::new(
                "storage.pool_size",
                "Pool size must be greater than 0",
            ));
        }
    }

    fn validate_engine(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.engine.writer_heap_bytes < MIN_WRITER_HEAP_BYTES {
            errors.push(ValidationError::new(
                "engine.writer_heap_bytes",
                format!(
                    "Writer heap must be at least {} bytes, got {}",
                    MIN_WRITER_HEAP_BYTES, config.engine.writer_heap_bytes
                ),
            ));
        }

        if config.engine.default_limit == 0 {
            errors.push(ValidationError::new(
                "engine.default_limit",
                "Default limit must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.overfetch_multiplier == 0 {
            errors.push(ValidationError::new(
                "search.overfetch_multiplier",
                "Overfetch multiplier must be greater than 0",
            ));
        }
    }
}
