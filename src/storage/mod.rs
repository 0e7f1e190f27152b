//! Storage layer for kbsearch
//!
//! The SQLite database is the source of truth; the tantivy index under the same
//! data directory is rebuilt from it.

pub mod database;
pub mod import;
pub mod repository;

use crate::config::{EngineConfig, StorageConfig};
use crate::content::ContentRepository;
use crate::engine::TantivyIndex;
use crate::error::{KbSearchError, Result};
use std::path::{Path, PathBuf};

pub use database::{Database, DbPool, DbStats};
pub use import::{ContentDump, ImportStats};
pub use repository::SqliteRepository;

/// Storage manager that owns the database and the search index location
pub struct StorageManager {
    pub database: Database,
    index_path: PathBuf,
}

impl StorageManager {
    /// Open (or create) the database and index directory described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let database_path = config.database_path()?;
        let index_path = config.index_path()?;

        std::fs::create_dir_all(&index_path).map_err(|e| KbSearchError::Io {
            source: e,
            context: format!("Failed to create index directory: {}", index_path.display()),
        })?;

        let database = Database::new(&database_path, config.pool_size)?;

        tracing::debug!(
            "Opened storage at {} (index {})",
            database_path.display(),
            index_path.display()
        );

        Ok(Self {
            database,
            index_path,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn repository(&self) -> SqliteRepository {
        SqliteRepository::new(self.database.clone())
    }

    pub fn open_index(&self, config: &EngineConfig) -> Result<TantivyIndex> {
        Ok(TantivyIndex::open(self.index_path.clone(), config)?)
    }

    /// Rebuild `index` from every translation in the database
    pub fn reindex(&self, index: &mut TantivyIndex) -> Result<usize> {
        let documents = self.repository().index_documents()?;
        Ok(index.rebuild(documents)?)
    }

    /// Get combined storage statistics
    pub fn stats(&self, index: Option<&TantivyIndex>) -> Result<StorageStats> {
        Ok(StorageStats {
            db: self.database.stats()?,
            indexed_documents: index.map(|index| index.len()),
            index_size: Self::dir_size(&self.index_path)?,
        })
    }

    /// Calculate directory size recursively
    fn dir_size(path: &Path) -> Result<u64> {
        let mut size = 0u64;

        if path.is_dir() {
            for entry in std::fs::read_dir(path).map_err(|e| KbSearchError::Io {
                source: e,
                context: format!(
                    "Failed to read directory for size calculation: {}",
                    path.display()
                ),
            })? {
                let entry = entry.map_err(|e| KbSearchError::Io {
                    source: e,
                    context: "Failed to read directory entry for size calculation".to_string(),
                })?;
                let path = entry.path();

                if path.is_dir() {
                    size += Self::dir_size(&path)?;
                } else {
                    size += entry
                        .metadata()
                        .map_err(|e| KbSearchError::Io {
                            source: e,
                            context: format!("Failed to get file metadata: {}", path.display()),
                        })?
                        .len();
                }
            }
        }

        Ok(size)
    }
}

/// Combined storage statistics
#[derive(Debug, serde::Serialize)]
pub struct StorageStats {
    pub db: DbStats,
    /// `None` when the index could not be opened
    pub indexed_documents: Option<u64>,
    pub index_size: u64,
}

impl StorageStats {
    /// Format size as human-readable string
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;
    use crate::engine::{FullTextEngine, SearchOptions};
    use tempfile::TempDir;

    fn storage_config(dir: &Path) -> StorageConfig {
        StorageConfig {
            data_dir: dir.to_path_buf(),
            database_file: "kb.sqlite".to_string(),
            index_dir: "index".to_string(),
            pool_size: 2,
        }
    }

    #[test]
    fn test_storage_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::open(&storage_config(temp_dir.path())).unwrap();

        assert!(temp_dir.path().join("kb.sqlite").exists());
        assert!(storage.index_path().exists());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(StorageStats::format_size(0), "0.00 B");
        assert_eq!(StorageStats::format_size(1023), "1023.00 B");
        assert_eq!(StorageStats::format_size(1024), "1.00 KB");
        assert_eq!(StorageStats::format_size(1024 * 1024), "1.00 MB");
    }

    #[test]
    fn test_reindex_from_database() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageManager::open(&storage_config(temp_dir.path())).unwrap();

        let dump: ContentDump = serde_json::from_value(serde_json::json!({
            "knowledge_bases": [{
                "id": 1, "name": "Help",
                "locales": [{"id": 10, "locale": "en-us"}],
                "translations": [{"id": 100, "kb_locale_id": 10, "title": "Help Center"}]
            }],
            "categories": [{"id": 2, "knowledge_base_id": 1,
                "translations": [{"id": 200, "kb_locale_id": 10, "title": "Printers"}]}],
            "answers": [{"id": 3, "category_id": 2, "state": "published",
                "translations": [{"id": 300, "kb_locale_id": 10, "title": "Printer jams",
                                  "body": "Open the tray"}]}]
        }))
        .unwrap();
        storage.database.import(&dump).unwrap();

        let mut index = storage.open_index(&EngineConfig::default()).unwrap();
        assert_eq!(storage.reindex(&mut index).unwrap(), 3);
        assert_eq!(index.len(), 3);

        let hits = index
            .search("tray", &ContentType::ALL, &SearchOptions::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_i64(), Some(300));

        let stats = storage.stats(Some(&index)).unwrap();
        assert_eq!(stats.indexed_documents, Some(3));
        assert_eq!(stats.db.answer_count, 1);
    }
}
