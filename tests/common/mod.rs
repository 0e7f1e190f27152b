#![allow(dead_code)]

use std::sync::Arc;

use kbsearch::config::{EngineConfig, SearchConfig, StorageConfig};
use kbsearch::content::InternalAssetsProvider;
use kbsearch::engine::TantivyIndex;
use kbsearch::search::SearchBackends;
use kbsearch::storage::{ContentDump, SqliteRepository, StorageManager};
use tempfile::TempDir;

/// Two knowledge bases:
///
/// * 1 "Help": locales 10 (en-us) and 11 (de-de), category 2 with child 3,
///   published answer 4 in category 2 and internal answer 5 in category 3.
/// * 6 "Staff" with granular permissions: locale 60 (en-us), category 7
///   (Support: reader) holding published answer 8 and internal answer 9,
///   category 12 (Support: none) holding published answer 11.
pub fn fixture_dump() -> ContentDump {
    serde_json::from_value(serde_json::json!({
        "knowledge_bases": [
            {
                "id": 1,
                "name": "Help",
                "locales": [
                    {"id": 10, "locale": "en-us", "primary": true},
                    {"id": 11, "locale": "de-de"}
                ],
                "translations": [
                    {"id": 100, "kb_locale_id": 10, "title": "Help Center"},
                    {"id": 101, "kb_locale_id": 11, "title": "Hilfe"}
                ]
            },
            {
                "id": 6,
                "name": "Staff",
                "granular_permissions": true,
                "locales": [{"id": 60, "locale": "en-us"}],
                "translations": [{"id": 600, "kb_locale_id": 60, "title": "Staff Handbook"}]
            }
        ],
        "categories": [
            {
                "id": 2,
                "knowledge_base_id": 1,
                "translations": [
                    {"id": 200, "kb_locale_id": 10, "title": "Printing"},
                    {"id": 201, "kb_locale_id": 11, "title": "Drucken"}
                ]
            },
            {
                "id": 3,
                "knowledge_base_id": 1,
                "parent_id": 2,
                "translations": [{"id": 300, "kb_locale_id": 10, "title": "Printer setup"}]
            },
            {
                "id": 7,
                "knowledge_base_id": 6,
                "translations": [{"id": 700, "kb_locale_id": 60, "title": "Printer internals"}],
                "permissions": [{"role": "Support", "access": "reader"}]
            },
            {
                "id": 12,
                "knowledge_base_id": 6,
                "translations": [{"id": 1200, "kb_locale_id": 60, "title": "Printer purchasing"}],
                "permissions": [{"role": "Support", "access": "none"}]
            }
        ],
        "answers": [
            {
                "id": 4,
                "category_id": 2,
                "state": "published",
                "translations": [
                    {"id": 400, "kb_locale_id": 10, "title": "Printer jams",
                     "body": "Ask the help desk to open the printer tray", "tags": ["hardware"],
                     "updated_at": 100},
                    {"id": 401, "kb_locale_id": 11, "title": "Drucker Papierstau",
                     "body": "Drucker öffnen", "updated_at": 200}
                ]
            },
            {
                "id": 5,
                "category_id": 3,
                "state": "internal",
                "translations": [
                    {"id": 500, "kb_locale_id": 10, "title": "Printer drivers",
                     "body": "Install the printer driver from the share", "updated_at": 300}
                ]
            },
            {
                "id": 8,
                "category_id": 7,
                "state": "published",
                "translations": [
                    {"id": 800, "kb_locale_id": 60, "title": "Printer firmware", "updated_at": 400}
                ]
            },
            {
                "id": 9,
                "category_id": 7,
                "state": "internal",
                "translations": [
                    {"id": 900, "kb_locale_id": 60, "title": "Printer service codes", "updated_at": 500}
                ]
            },
            {
                "id": 11,
                "category_id": 12,
                "state": "published",
                "translations": [
                    {"id": 1100, "kb_locale_id": 60, "title": "Printer budget", "updated_at": 600}
                ]
            }
        ]
    }))
    .unwrap()
}

pub struct Fixture {
    pub dir: TempDir,
    pub storage: StorageManager,
    pub repository: Arc<SqliteRepository>,
    pub index: Arc<TantivyIndex>,
}

impl Fixture {
    /// On-disk database and index seeded with [`fixture_dump`]
    pub fn new(engine_enabled: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::open(&StorageConfig {
            data_dir: dir.path().to_path_buf(),
            database_file: "kb.sqlite".to_string(),
            index_dir: "index".to_string(),
            pool_size: 4,
        })
        .unwrap();

        storage.database.import(&fixture_dump()).unwrap();

        let engine_config = EngineConfig {
            enabled: engine_enabled,
            ..Default::default()
        };
        let mut index = storage.open_index(&engine_config).unwrap();
        storage.reindex(&mut index).unwrap();

        let repository = Arc::new(storage.repository());

        Self {
            dir,
            storage,
            repository,
            index: Arc::new(index),
        }
    }

    pub fn backends(&self) -> SearchBackends {
        SearchBackends::new(
            self.repository.clone(),
            self.index.clone(),
            self.repository.clone(),
            SearchConfig::default(),
        )
    }

    pub fn backends_with_assets(&self, assets: Arc<dyn InternalAssetsProvider>) -> SearchBackends {
        SearchBackends::new(
            self.repository.clone(),
            self.index.clone(),
            assets,
            SearchConfig::default(),
        )
    }
}

pub fn sorted_ids(hits: &[kbsearch::search::SearchHit]) -> Vec<i64> {
    let mut ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
    ids.sort_unstable();
    ids
}
