//! SQLite-backed content repository

use ahash::AHashMap;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::database::Database;
use crate::content::{
    Answer, AnswerState, Caller, Category, CategoryAccess, ContentRepository, ContentType,
    FallbackQuery, InternalAssets, InternalAssetsProvider, KbLocale, KnowledgeBase, OrderBy,
    SortDirection, TranslationRef,
};
use crate::engine::IndexDocument;
use crate::error::{KbSearchError, Result};

/// `?, ?, ?` for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn id_values(ids: &[i64]) -> impl Iterator<Item = Value> + '_ {
    ids.iter().map(|id| Value::Integer(*id))
}

/// Lowercased `%text%` with LIKE wildcards in the user text escaped.
/// Matched against `unicode_lower(column)`.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn order_clause(alias: &str, order: &[OrderBy]) -> Result<String> {
    let mut parts = Vec::with_capacity(order.len() + 1);
    for entry in order {
        if !entry.is_orderable() {
            return Err(KbSearchError::InvalidParams(format!(
                "Cannot order by '{}'",
                entry.field
            )));
        }
        parts.push(format!("{}.{} {}", alias, entry.field, entry.direction.as_sql()));
    }
    // stable pages when the requested columns tie
    parts.push(format!("{}.id {}", alias, SortDirection::Asc.as_sql()));
    Ok(parts.join(", "))
}

fn collect_translations(
    conn: &Connection,
    sql: &str,
    ids: &[i64],
) -> Result<AHashMap<i64, Vec<TranslationRef>>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(id_values(ids)), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            TranslationRef {
                id: row.get(1)?,
                kb_locale_id: row.get(2)?,
            },
        ))
    })?;

    let mut by_owner: AHashMap<i64, Vec<TranslationRef>> = AHashMap::new();
    for row in rows {
        let (owner, translation) = row?;
        by_owner.entry(owner).or_default().push(translation);
    }
    Ok(by_owner)
}

/// Repository reading knowledge base content from SQLite
#[derive(Clone)]
pub struct SqliteRepository {
    db: Database,
}

impl SqliteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn load_knowledge_bases(&self, filter: &str, ids: &[i64]) -> Result<Vec<KnowledgeBase>> {
        let conn = self.db.get_conn()?;
        let sql = format!(
            "SELECT id, name, active, granular_permissions FROM knowledge_bases {} ORDER BY id",
            filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut knowledge_bases = stmt
            .query_map(params_from_iter(id_values(ids)), |row| {
                Ok(KnowledgeBase {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get(2)?,
                    granular_permissions: row.get(3)?,
                    translations: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let kb_ids: Vec<i64> = knowledge_bases.iter().map(|kb| kb.id).collect();
        if kb_ids.is_empty() {
            return Ok(knowledge_bases);
        }

        let mut translations = collect_translations(
            &conn,
            &format!(
                "SELECT knowledge_base_id, id, kb_locale_id FROM kb_translations
                 WHERE knowledge_base_id IN ({}) ORDER BY id",
                placeholders(kb_ids.len())
            ),
            &kb_ids,
        )?;

        for kb in &mut knowledge_bases {
            kb.translations = translations.remove(&kb.id).unwrap_or_default();
        }

        Ok(knowledge_bases)
    }

    fn explicit_access(
        &self,
        roles: &[String],
        knowledge_base_ids: &[i64],
    ) -> Result<AHashMap<i64, CategoryAccess>> {
        let mut explicit = AHashMap::new();
        if roles.is_empty() || knowledge_base_ids.is_empty() {
            return Ok(explicit);
        }

        let conn = self.db.get_conn()?;
        let sql = format!(
            "SELECT p.category_id, p.access FROM kb_category_permissions p
             JOIN kb_categories c ON c.id = p.category_id
             WHERE p.role IN ({}) AND c.knowledge_base_id IN ({})",
            placeholders(roles.len()),
            placeholders(knowledge_base_ids.len())
        );
        let values = roles
            .iter()
            .map(|role| Value::Text(role.clone()))
            .chain(id_values(knowledge_base_ids));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (category_id, access) = row?;
            let access: CategoryAccess = access.parse()?;
            // strongest grant across the caller's roles wins
            let entry = explicit.entry(category_id).or_insert(access);
            if access > *entry {
                *entry = access;
            }
        }

        Ok(explicit)
    }
}

impl ContentRepository for SqliteRepository {
    fn active_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        self.load_knowledge_bases("WHERE active = 1", &[])
    }

    fn knowledge_bases(&self, ids: &[i64]) -> Result<Vec<KnowledgeBase>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_knowledge_bases(&format!("WHERE id IN ({})", placeholders(ids.len())), ids)
    }

    fn locales(&self, knowledge_base_ids: &[i64], code: Option<&str>) -> Result<Vec<KbLocale>> {
        if knowledge_base_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.get_conn()?;
        let mut sql = format!(
            "SELECT l.id, l.knowledge_base_id, s.locale, l.primary_locale
             FROM kb_locales l JOIN system_locales s ON s.id = l.system_locale_id
             WHERE l.knowledge_base_id IN ({})",
            placeholders(knowledge_base_ids.len())
        );
        let mut values: Vec<Value> = id_values(knowledge_base_ids).collect();
        if let Some(code) = code {
            sql.push_str(" AND s.locale = ?");
            values.push(Value::Text(code.to_string()));
        }
        sql.push_str(" ORDER BY l.id");

        let mut stmt = conn.prepare(&sql)?;
        let locales = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(KbLocale {
                    id: row.get(0)?,
                    knowledge_base_id: row.get(1)?,
                    locale: row.get(2)?,
                    primary: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(locales)
    }

    fn categories(&self, knowledge_base_ids: &[i64]) -> Result<Vec<Category>> {
        if knowledge_base_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.get_conn()?;
        let in_list = placeholders(knowledge_base_ids.len());

        let mut stmt = conn.prepare(&format!(
            "SELECT id, knowledge_base_id, parent_id FROM kb_categories
             WHERE knowledge_base_id IN ({}) ORDER BY position, id",
            in_list
        ))?;
        let mut categories = stmt
            .query_map(params_from_iter(id_values(knowledge_base_ids)), |row| {
                Ok(Category {
                    id: row.get(0)?,
                    knowledge_base_id: row.get(1)?,
                    parent_id: row.get(2)?,
                    translations: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut translations = collect_translations(
            &conn,
            &format!(
                "SELECT t.category_id, t.id, t.kb_locale_id FROM kb_category_translations t
                 JOIN kb_categories c ON c.id = t.category_id
                 WHERE c.knowledge_base_id IN ({}) ORDER BY t.id",
                in_list
            ),
            knowledge_base_ids,
        )?;

        for category in &mut categories {
            category.translations = translations.remove(&category.id).unwrap_or_default();
        }

        Ok(categories)
    }

    fn answers(&self, knowledge_base_ids: &[i64]) -> Result<Vec<Answer>> {
        if knowledge_base_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.get_conn()?;
        let in_list = placeholders(knowledge_base_ids.len());

        let mut stmt = conn.prepare(&format!(
            "SELECT a.id, a.category_id, c.knowledge_base_id, a.state FROM kb_answers a
             JOIN kb_categories c ON c.id = a.category_id
             WHERE c.knowledge_base_id IN ({}) ORDER BY a.position, a.id",
            in_list
        ))?;
        let rows = stmt
            .query_map(params_from_iter(id_values(knowledge_base_ids)), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut translations = collect_translations(
            &conn,
            &format!(
                "SELECT t.answer_id, t.id, t.kb_locale_id FROM kb_answer_translations t
                 JOIN kb_answers a ON a.id = t.answer_id
                 JOIN kb_categories c ON c.id = a.category_id
                 WHERE c.knowledge_base_id IN ({}) ORDER BY t.id",
                in_list
            ),
            knowledge_base_ids,
        )?;

        rows.into_iter()
            .map(|(id, category_id, knowledge_base_id, state)| {
                Ok(Answer {
                    id,
                    category_id,
                    knowledge_base_id,
                    state: state.parse::<AnswerState>()?,
                    translations: translations.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    fn category_subtree_ids(&self, category_id: i64) -> Result<Vec<i64>> {
        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(
            "WITH RECURSIVE subtree(id) AS (
                SELECT id FROM kb_categories WHERE id = ?1
                UNION
                SELECT c.id FROM kb_categories c JOIN subtree s ON c.parent_id = s.id
             )
             SELECT id FROM subtree",
        )?;
        let ids = stmt
            .query_map(params![category_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn fallback_search(
        &self,
        content_type: ContentType,
        query: &FallbackQuery<'_>,
    ) -> Result<Vec<i64>> {
        // no subtree filter exists on this path, so a scoped search finds nothing
        if query.scope_ids.is_some() || query.kb_locale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let table = match content_type {
            ContentType::KnowledgeBaseTranslation => "kb_translations",
            ContentType::CategoryTranslation => "kb_category_translations",
            ContentType::AnswerTranslation => "kb_answer_translations",
        };

        let sql = format!(
            "SELECT t.id FROM {} t
             WHERE unicode_lower(t.title) LIKE ? ESCAPE '\\'
               AND t.kb_locale_id IN ({})
             ORDER BY {}",
            table,
            placeholders(query.kb_locale_ids.len()),
            order_clause("t", query.order)?
        );

        let values = std::iter::once(Value::Text(like_pattern(query.text)))
            .chain(id_values(query.kb_locale_ids));

        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(values), |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;

        tracing::debug!(
            "Fallback search in {} matched {} rows",
            content_type,
            ids.len()
        );

        Ok(ids)
    }

    fn index_documents(&self) -> Result<Vec<IndexDocument>> {
        let conn = self.db.get_conn()?;
        let mut documents = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT t.id, t.kb_locale_id, t.title, t.created_at, t.updated_at
             FROM kb_translations t ORDER BY t.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(IndexDocument {
                content_type: ContentType::KnowledgeBaseTranslation,
                id: row.get(0)?,
                kb_locale_id: row.get(1)?,
                scope_id: None,
                title: row.get(2)?,
                body: String::new(),
                tags: Vec::new(),
                attachment: String::new(),
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        for row in rows {
            documents.push(row?);
        }

        // categories are scoped by their parent
        let mut stmt = conn.prepare(
            "SELECT t.id, t.kb_locale_id, c.parent_id, t.title, t.created_at, t.updated_at
             FROM kb_category_translations t JOIN kb_categories c ON c.id = t.category_id
             ORDER BY t.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(IndexDocument {
                content_type: ContentType::CategoryTranslation,
                id: row.get(0)?,
                kb_locale_id: row.get(1)?,
                scope_id: row.get(2)?,
                title: row.get(3)?,
                body: String::new(),
                tags: Vec::new(),
                attachment: String::new(),
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        for row in rows {
            documents.push(row?);
        }

        let mut stmt = conn.prepare(
            "SELECT t.id, t.kb_locale_id, a.category_id, t.title, t.body, t.tags, t.attachment,
                    t.created_at, t.updated_at
             FROM kb_answer_translations t JOIN kb_answers a ON a.id = t.answer_id
             ORDER BY t.id",
        )?;
        let rows = stmt.query_map([], |row| {
            let tags: String = row.get(5)?;
            Ok(IndexDocument {
                content_type: ContentType::AnswerTranslation,
                id: row.get(0)?,
                kb_locale_id: row.get(1)?,
                scope_id: Some(row.get(2)?),
                title: row.get(3)?,
                body: row.get(4)?,
                tags: tags
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
                attachment: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        })?;
        for row in rows {
            documents.push(row?);
        }

        Ok(documents)
    }
}

impl InternalAssetsProvider for SqliteRepository {
    fn internal_assets(
        &self,
        caller: Option<&Caller>,
        knowledge_base_ids: &[i64],
    ) -> Result<InternalAssets> {
        let Some(caller) = caller else {
            return Ok(InternalAssets::default());
        };

        let categories = self.categories(knowledge_base_ids)?;
        let answers = self.answers(knowledge_base_ids)?;
        let explicit = self.explicit_access(&caller.roles, knowledge_base_ids)?;

        let assets = InternalAssets::resolve(
            &categories,
            &answers,
            &explicit,
            CategoryAccess::default_for(caller),
        );

        tracing::debug!(
            "Caller {} may see {} answers and {} categories",
            caller.id,
            assets.all_answer_ids().len(),
            assets.all_category_ids().len()
        );

        Ok(assets)
    }
}
