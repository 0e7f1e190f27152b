//! Options document handed to the full-text engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::SortDirection;

/// `{"terms": {"<field>": [ids...]}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsClause {
    pub terms: BTreeMap<String, Vec<i64>>,
}

impl TermsClause {
    pub fn new(field: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(field.into(), ids.into_iter().collect());
        Self { terms }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolClause {
    pub must: Vec<TermsClause>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExtension {
    #[serde(rename = "bool")]
    pub bool_clause: BoolClause,
}

/// Fields searched or highlighted, keyed by index type tag
pub type FieldsByIndex = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub query_extension: QueryExtension,

    /// Absent means the engine searches its default fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_fields_by_indexes: Option<FieldsByIndex>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_fields_by_indexes: Option<FieldsByIndex>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_by: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<SortDirection>,

    #[serde(default)]
    pub fulltext: bool,
}

impl SearchOptions {
    pub fn must(&self) -> &[TermsClause] {
        &self.query_extension.bool_clause.must
    }

    pub fn push_must(&mut self, clause: TermsClause) {
        self.query_extension.bool_clause.must.push(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_shape() {
        let mut options = SearchOptions::default();
        options.push_must(TermsClause::new("kb_locale_id", [1, 2]));
        options.sort_by = vec!["updated_at".to_string()];
        options.order_by = vec![SortDirection::Desc];
        options.fulltext = true;

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query_extension": {"bool": {"must": [{"terms": {"kb_locale_id": [1, 2]}}]}},
                "sort_by": ["updated_at"],
                "order_by": ["desc"],
                "fulltext": true
            })
        );
    }
}
