//! Configuration management for kbsearch
//!
//! Loads the TOML configuration, applies profile and environment overrides and
//! validates the result before anything else touches storage or the index.

use crate::content::Flavor;
use crate::error::{KbSearchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// SQLite file name inside `data_dir`
    pub database_file: String,
    /// Tantivy directory name inside `data_dir`
    pub index_dir: String,
    pub pool_size: u32,
}

impl StorageConfig {
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(expand_path(&self.data_dir)?.join(&self.database_file))
    }

    pub fn index_path(&self) -> Result<PathBuf> {
        Ok(expand_path(&self.data_dir)?.join(&self.index_dir))
    }
}

/// Full-text engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// When false every search goes through the relational fallback
    pub enabled: bool,
    pub writer_heap_bytes: usize,
    /// Page size used when a search does not ask for one
    pub default_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            writer_heap_bytes: 50_000_000,
            default_limit: 10,
        }
    }
}

/// Search orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size multiplier for paginated engine queries, so enough hits
    /// survive permission filtering to fill the page
    pub overfetch_multiplier: usize,
    pub default_flavor: Flavor,
    pub highlight_enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            overfetch_multiplier: 99,
            default_flavor: Flavor::Public,
            highlight_enabled: true,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_flavor: Option<Flavor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overfetch_multiplier: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_enabled: Option<bool>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KbSearchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| KbSearchError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| KbSearchError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| KbSearchError::Config(format!("Unknown profile '{}'", profile)))?;

        if let Some(enabled) = overrides.engine_enabled {
            self.engine.enabled = enabled;
        }
        if let Some(flavor) = overrides.default_flavor {
            self.search.default_flavor = flavor;
        }
        if let Some(multiplier) = overrides.overfetch_multiplier {
            self.search.overfetch_multiplier = multiplier;
        }
        if let Some(highlight) = overrides.highlight_enabled {
            self.search.highlight_enabled = highlight;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: KBSEARCH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    pub fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("KBSEARCH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        let invalid = |kind: &str| KbSearchError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}' as {}", value, kind),
        };

        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "ENGINE__ENABLED" => {
                self.engine.enabled = value.parse().map_err(|_| invalid("boolean"))?;
            }
            "ENGINE__DEFAULT_LIMIT" => {
                self.engine.default_limit = value.parse().map_err(|_| invalid("integer"))?;
            }
            "SEARCH__OVERFETCH_MULTIPLIER" => {
                self.search.overfetch_multiplier =
                    value.parse().map_err(|_| invalid("integer"))?;
            }
            "SEARCH__DEFAULT_FLAVOR" => {
                self.search.default_flavor = value.parse().map_err(|_| invalid("flavor"))?;
            }
            "SEARCH__HIGHLIGHT_ENABLED" => {
                self.search.highlight_enabled = value.parse().map_err(|_| invalid("boolean"))?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| KbSearchError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("kbsearch").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.kbsearch"),
                database_file: "kb.sqlite".to_string(),
                index_dir: "index".to_string(),
                pool_size: 8,
            },
            engine: EngineConfig::default(),
            search: SearchConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| KbSearchError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| KbSearchError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
