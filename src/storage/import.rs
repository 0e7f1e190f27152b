//! JSON content dumps loaded into the database in one transaction

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::database::Database;
use crate::content::{AnswerState, CategoryAccess};
use crate::error::{KbSearchError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDump {
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBaseRecord>,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseRecord {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub granular_permissions: bool,
    pub locales: Vec<LocaleRecord>,
    #[serde(default)]
    pub translations: Vec<TitleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleRecord {
    pub id: i64,
    /// System locale code, e.g. `de-de`
    pub locale: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: i64,
    pub kb_locale_id: i64,
    pub title: String,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub knowledge_base_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub translations: Vec<TitleRecord>,
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub role: String,
    pub access: CategoryAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: i64,
    pub category_id: i64,
    pub state: AnswerState,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub translations: Vec<AnswerTranslationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerTranslationRecord {
    pub id: i64,
    pub kb_locale_id: i64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachment: String,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

fn default_true() -> bool {
    true
}

/// Rows written by an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub knowledge_bases: usize,
    pub categories: usize,
    pub answers: usize,
    pub translations: usize,
}

impl ContentDump {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KbSearchError::Io {
            source: e,
            context: format!("Failed to read content dump: {:?}", path),
        })?;

        serde_json::from_str(&content).map_err(|e| KbSearchError::Json {
            source: e,
            context: format!("Failed to parse content dump: {:?}", path),
        })
    }
}

impl Database {
    /// Upsert every record of the dump. Rows the dump does not mention are
    /// kept. Parents must precede children in `categories`.
    pub fn import(&self, dump: &ContentDump) -> Result<ImportStats> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();
        let mut stats = ImportStats::default();

        for kb in &dump.knowledge_bases {
            tx.execute(
                "INSERT INTO knowledge_bases
                 (id, name, active, granular_permissions, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    active = excluded.active,
                    granular_permissions = excluded.granular_permissions,
                    updated_at = excluded.updated_at",
                params![kb.id, kb.name, kb.active, kb.granular_permissions, now],
            )?;

            for locale in &kb.locales {
                let system_locale_id = system_locale_id(&tx, &locale.locale)?;
                tx.execute(
                    "INSERT INTO kb_locales
                     (id, knowledge_base_id, system_locale_id, primary_locale)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        knowledge_base_id = excluded.knowledge_base_id,
                        system_locale_id = excluded.system_locale_id,
                        primary_locale = excluded.primary_locale",
                    params![locale.id, kb.id, system_locale_id, locale.primary],
                )?;
            }

            for translation in &kb.translations {
                tx.execute(
                    "INSERT INTO kb_translations
                     (id, knowledge_base_id, kb_locale_id, title, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        knowledge_base_id = excluded.knowledge_base_id,
                        kb_locale_id = excluded.kb_locale_id,
                        title = excluded.title,
                        updated_at = excluded.updated_at",
                    params![
                        translation.id,
                        kb.id,
                        translation.kb_locale_id,
                        translation.title,
                        now,
                        translation.updated_at.unwrap_or(now)
                    ],
                )?;
                stats.translations += 1;
            }
            stats.knowledge_bases += 1;
        }

        for category in &dump.categories {
            tx.execute(
                "INSERT INTO kb_categories
                 (id, knowledge_base_id, parent_id, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    knowledge_base_id = excluded.knowledge_base_id,
                    parent_id = excluded.parent_id,
                    position = excluded.position,
                    updated_at = excluded.updated_at",
                params![
                    category.id,
                    category.knowledge_base_id,
                    category.parent_id,
                    category.position,
                    now
                ],
            )?;

            for translation in &category.translations {
                tx.execute(
                    "INSERT INTO kb_category_translations
                     (id, category_id, kb_locale_id, title, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                        category_id = excluded.category_id,
                        kb_locale_id = excluded.kb_locale_id,
                        title = excluded.title,
                        updated_at = excluded.updated_at",
                    params![
                        translation.id,
                        category.id,
                        translation.kb_locale_id,
                        translation.title,
                        now,
                        translation.updated_at.unwrap_or(now)
                    ],
                )?;
                stats.translations += 1;
            }

            for permission in &category.permissions {
                tx.execute(
                    "INSERT INTO kb_category_permissions (category_id, role, access)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(category_id, role) DO UPDATE SET access = excluded.access",
                    params![category.id, permission.role, permission.access.as_str()],
                )?;
            }
            stats.categories += 1;
        }

        for answer in &dump.answers {
            tx.execute(
                "INSERT INTO kb_answers
                 (id, category_id, state, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    state = excluded.state,
                    position = excluded.position,
                    updated_at = excluded.updated_at",
                params![
                    answer.id,
                    answer.category_id,
                    answer.state.as_str(),
                    answer.position,
                    now
                ],
            )?;

            for translation in &answer.translations {
                tx.execute(
                    "INSERT INTO kb_answer_translations
                     (id, answer_id, kb_locale_id, title, body, tags, attachment, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(id) DO UPDATE SET
                        answer_id = excluded.answer_id,
                        kb_locale_id = excluded.kb_locale_id,
                        title = excluded.title,
                        body = excluded.body,
                        tags = excluded.tags,
                        attachment = excluded.attachment,
                        updated_at = excluded.updated_at",
                    params![
                        translation.id,
                        answer.id,
                        translation.kb_locale_id,
                        translation.title,
                        translation.body,
                        translation.tags.join(","),
                        translation.attachment,
                        now,
                        translation.updated_at.unwrap_or(now)
                    ],
                )?;
                stats.translations += 1;
            }
            stats.answers += 1;
        }

        tx.commit()?;

        tracing::info!(
            "Imported {} knowledge bases, {} categories, {} answers, {} translations",
            stats.knowledge_bases,
            stats.categories,
            stats.answers,
            stats.translations
        );

        Ok(stats)
    }
}

fn system_locale_id(conn: &Connection, code: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM system_locales WHERE locale = ?1",
            params![code],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute("INSERT INTO system_locales (locale) VALUES (?1)", params![code])?;
    Ok(conn.last_insert_rowid())
}
