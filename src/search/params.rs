//! Search parameters and pagination

use serde::{Deserialize, Serialize};

use crate::content::{ContentType, Flavor, KbLocale, OrderBy};
use crate::error::{KbSearchError, Result};

/// Which knowledge bases a search covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeBaseSelection {
    /// Every active knowledge base
    #[default]
    Active,
    /// Exactly these, active or not
    Only(Vec<i64>),
}

/// Which locales a search covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocaleSelector {
    /// All locales of the selected knowledge bases
    #[default]
    Any,
    /// A single, already resolved locale
    Locale(KbLocale),
    /// Locales of the selected knowledge bases using this system locale code
    Code(String),
}

/// Parameters of one knowledge base search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub knowledge_bases: KnowledgeBaseSelection,
    pub locale: LocaleSelector,
    /// Category whose subtree the search is restricted to
    pub scope: Option<i64>,
    pub flavor: Flavor,
    /// `None` searches every content type
    pub indexes: Option<Vec<ContentType>>,
    pub limit: Option<usize>,
    pub from: Option<usize>,
    /// Applied in order; empty keeps engine relevance
    pub order_by: Vec<OrderBy>,
    pub highlight_enabled: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            knowledge_bases: KnowledgeBaseSelection::Active,
            locale: LocaleSelector::Any,
            scope: None,
            flavor: Flavor::Public,
            indexes: None,
            limit: None,
            from: None,
            order_by: Vec::new(),
            highlight_enabled: true,
        }
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn knowledge_base(mut self, id: i64) -> Self {
        match &mut self.knowledge_bases {
            KnowledgeBaseSelection::Only(ids) => ids.push(id),
            selection => *selection = KnowledgeBaseSelection::Only(vec![id]),
        }
        self
    }

    pub fn knowledge_bases(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.knowledge_bases = KnowledgeBaseSelection::Only(ids.into_iter().collect());
        self
    }

    pub fn locale(mut self, locale: KbLocale) -> Self {
        self.locale = LocaleSelector::Locale(locale);
        self
    }

    pub fn locale_code(mut self, code: impl Into<String>) -> Self {
        self.locale = LocaleSelector::Code(code.into());
        self
    }

    pub fn scope(mut self, category_id: i64) -> Self {
        self.scope = Some(category_id);
        self
    }

    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn index(mut self, content_type: ContentType) -> Self {
        self.indexes.get_or_insert_with(Vec::new).push(content_type);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn highlight(mut self, enabled: bool) -> Self {
        self.highlight_enabled = enabled;
        self
    }

    /// Content types to search, in the order they were requested
    pub fn resolved_indexes(&self) -> Vec<ContentType> {
        match &self.indexes {
            Some(indexes) => {
                let mut unique = Vec::with_capacity(indexes.len());
                for content_type in indexes {
                    if !unique.contains(content_type) {
                        unique.push(*content_type);
                    }
                }
                unique
            }
            None => ContentType::ALL.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(&self.indexes, Some(indexes) if indexes.is_empty()) {
            return Err(KbSearchError::InvalidParams(
                "Index list cannot be empty".to_string(),
            ));
        }

        if let LocaleSelector::Code(code) = &self.locale {
            if code.trim().is_empty() {
                return Err(KbSearchError::InvalidParams(
                    "Locale code cannot be empty".to_string(),
                ));
            }
        }

        if self.limit == Some(0) {
            return Err(KbSearchError::InvalidParams(
                "Limit must be greater than 0".to_string(),
            ));
        }

        if let Some(order) = self.order_by.iter().find(|order| !order.is_orderable()) {
            return Err(KbSearchError::InvalidParams(format!(
                "Cannot order by '{}'",
                order.field
            )));
        }

        Ok(())
    }
}

/// Window of the filtered result list a caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// One-based page number; page 0 is treated as the first page
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            offset: page.saturating_sub(1) * per_page,
            limit: per_page,
        }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SortDirection;

    #[test]
    fn test_defaults() {
        let params = SearchParams::default();
        assert_eq!(params.flavor, Flavor::Public);
        assert!(params.highlight_enabled);
        assert_eq!(params.resolved_indexes(), ContentType::ALL.to_vec());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let params = SearchParams::new()
            .knowledge_base(1)
            .knowledge_base(2)
            .locale_code("de-de")
            .index(ContentType::KnowledgeBaseTranslation)
            .index(ContentType::KnowledgeBaseTranslation)
            .order_by(OrderBy::new("title", SortDirection::Asc));

        assert_eq!(params.knowledge_bases, KnowledgeBaseSelection::Only(vec![1, 2]));
        assert_eq!(
            params.resolved_indexes(),
            vec![ContentType::KnowledgeBaseTranslation]
        );
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let empty_indexes = SearchParams {
            indexes: Some(vec![]),
            ..Default::default()
        };
        assert!(empty_indexes.validate().is_err());

        assert!(SearchParams::new().locale_code(" ").validate().is_err());
        assert!(SearchParams::new().limit(0).validate().is_err());
        assert!(SearchParams::new()
            .order_by(OrderBy::new("body", SortDirection::Asc))
            .validate()
            .is_err());
    }

    #[test]
    fn test_pages() {
        assert_eq!(Pagination::page(1, 10), Pagination::new(0, 10));
        assert_eq!(Pagination::page(3, 10), Pagination::new(20, 10));
        assert_eq!(Pagination::page(0, 5), Pagination::new(0, 5));

        let window = Pagination::new(1, 2).apply(vec![1, 2, 3, 4]);
        assert_eq!(window, vec![2, 3]);
        assert!(Pagination::new(10, 2).apply(vec![1, 2]).is_empty());
    }
}
