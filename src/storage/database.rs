//! SQLite database management with migrations
//!
//! Holds the relational source of truth: knowledge bases, locales, categories,
//! answers, their translations and per-role category permissions.

use crate::error::{KbSearchError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection};
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database manager with migration support
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection
    pub fn new(db_path: &Path, pool_size: u32) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KbSearchError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            register_functions(conn)
        });

        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        {
            let conn = pool.get()?;
            // WAL is a property of the file, once is enough
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                ",
            )?;
        }

        let db = Self { pool };
        db.migrate()?;

        Ok(db)
    }

    /// Private in-memory database. Uses a single connection so every caller
    /// sees the same data.
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            register_functions(conn)
        });
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };

        Ok(DbStats {
            knowledge_base_count: count("knowledge_bases")?,
            locale_count: count("kb_locales")?,
            category_count: count("kb_categories")?,
            answer_count: count("kb_answers")?,
            translation_count: count("kb_translations")?
                + count("kb_category_translations")?
                + count("kb_answer_translations")?,
            permission_count: count("kb_category_permissions")?,
        })
    }
}

/// SQL functions every pooled connection needs.
///
/// `unicode_lower(text)` folds case the same way Rust's `str::to_lowercase`
/// does. SQLite's built-in `LOWER` only folds ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DbStats {
    pub knowledge_base_count: usize,
    pub locale_count: usize,
    pub category_count: usize,
    pub answer_count: usize,
    pub translation_count: usize,
    pub permission_count: usize,
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE knowledge_bases (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        active BOOLEAN NOT NULL DEFAULT 1,
        granular_permissions BOOLEAN NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE system_locales (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        locale TEXT NOT NULL UNIQUE
    );

    CREATE TABLE kb_locales (
        id INTEGER PRIMARY KEY,
        knowledge_base_id INTEGER NOT NULL,
        system_locale_id INTEGER NOT NULL,
        primary_locale BOOLEAN NOT NULL DEFAULT 0,
        FOREIGN KEY (knowledge_base_id) REFERENCES knowledge_bases(id) ON DELETE CASCADE,
        FOREIGN KEY (system_locale_id) REFERENCES system_locales(id),
        UNIQUE (knowledge_base_id, system_locale_id)
    );

    CREATE TABLE kb_translations (
        id INTEGER PRIMARY KEY,
        knowledge_base_id INTEGER NOT NULL,
        kb_locale_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (knowledge_base_id) REFERENCES knowledge_bases(id) ON DELETE CASCADE,
        FOREIGN KEY (kb_locale_id) REFERENCES kb_locales(id) ON DELETE CASCADE,
        UNIQUE (knowledge_base_id, kb_locale_id)
    );

    CREATE TABLE kb_categories (
        id INTEGER PRIMARY KEY,
        knowledge_base_id INTEGER NOT NULL,
        parent_id INTEGER,
        position INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (knowledge_base_id) REFERENCES knowledge_bases(id) ON DELETE CASCADE,
        FOREIGN KEY (parent_id) REFERENCES kb_categories(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_kb_categories_kb ON kb_categories(knowledge_base_id);
    CREATE INDEX idx_kb_categories_parent ON kb_categories(parent_id);

    CREATE TABLE kb_category_translations (
        id INTEGER PRIMARY KEY,
        category_id INTEGER NOT NULL,
        kb_locale_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (category_id) REFERENCES kb_categories(id) ON DELETE CASCADE,
        FOREIGN KEY (kb_locale_id) REFERENCES kb_locales(id) ON DELETE CASCADE,
        UNIQUE (category_id, kb_locale_id)
    );

    CREATE TABLE kb_answers (
        id INTEGER PRIMARY KEY,
        category_id INTEGER NOT NULL,
        state TEXT NOT NULL CHECK (state IN ('draft', 'internal', 'published', 'archived')),
        position INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (category_id) REFERENCES kb_categories(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_kb_answers_category ON kb_answers(category_id);
    CREATE INDEX idx_kb_answers_state ON kb_answers(state);

    CREATE TABLE kb_answer_translations (
        id INTEGER PRIMARY KEY,
        answer_id INTEGER NOT NULL,
        kb_locale_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        body TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '',  -- comma separated
        attachment TEXT NOT NULL DEFAULT '',  -- extracted attachment text
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (answer_id) REFERENCES kb_answers(id) ON DELETE CASCADE,
        FOREIGN KEY (kb_locale_id) REFERENCES kb_locales(id) ON DELETE CASCADE,
        UNIQUE (answer_id, kb_locale_id)
    );

    CREATE INDEX idx_kb_answer_translations_updated ON kb_answer_translations(updated_at);

    CREATE TABLE kb_category_permissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        access TEXT NOT NULL CHECK (access IN ('none', 'reader', 'editor')),
        FOREIGN KEY (category_id) REFERENCES kb_categories(id) ON DELETE CASCADE,
        UNIQUE (category_id, role)
    );
    "#,
];
