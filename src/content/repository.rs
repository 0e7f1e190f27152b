//! Seams to the persistence layer

use super::access::InternalAssets;
use super::types::{Answer, Caller, Category, ContentType, KbLocale, KnowledgeBase, OrderBy};
use crate::engine::IndexDocument;
use crate::error::Result;

/// Relational substring search used while the full-text engine is unavailable
#[derive(Debug, Clone, Copy)]
pub struct FallbackQuery<'a> {
    /// Raw user text, matched literally and case-insensitively against titles
    pub text: &'a str,
    /// Category subtree the search is restricted to
    pub scope_ids: Option<&'a [i64]>,
    pub kb_locale_ids: &'a [i64],
    pub order: &'a [OrderBy],
}

/// Read access to knowledge base content
pub trait ContentRepository {
    fn active_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>>;

    /// Knowledge bases by id regardless of their active state. Unknown ids are skipped.
    fn knowledge_bases(&self, ids: &[i64]) -> Result<Vec<KnowledgeBase>>;

    /// Locales of the given knowledge bases, optionally only those whose
    /// system locale code equals `code`.
    fn locales(&self, knowledge_base_ids: &[i64], code: Option<&str>) -> Result<Vec<KbLocale>>;

    fn categories(&self, knowledge_base_ids: &[i64]) -> Result<Vec<Category>>;

    fn answers(&self, knowledge_base_ids: &[i64]) -> Result<Vec<Answer>>;

    /// The category followed by all of its descendants
    fn category_subtree_ids(&self, category_id: i64) -> Result<Vec<i64>>;

    /// Translation ids of `content_type` whose title contains the query text
    fn fallback_search(&self, content_type: ContentType, query: &FallbackQuery<'_>)
        -> Result<Vec<i64>>;

    /// Every translation in the shape the full-text index stores it
    fn index_documents(&self) -> Result<Vec<IndexDocument>>;
}

/// Computes granular-permission allow-lists for a caller
pub trait InternalAssetsProvider {
    fn internal_assets(
        &self,
        caller: Option<&Caller>,
        knowledge_base_ids: &[i64],
    ) -> Result<InternalAssets>;
}
