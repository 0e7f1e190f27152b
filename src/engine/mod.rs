//! Full-text engine seam and its tantivy implementation

mod index;
mod options;

pub use index::{IndexError, TantivyIndex};
pub use options::{BoolClause, FieldsByIndex, QueryExtension, SearchOptions, TermsClause};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::ContentType;

/// Identifier as reported by an engine. Some engines hand ids back as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawId::Int(id) => Some(*id),
            RawId::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Hit as returned by a full-text engine, before id coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub id: RawId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, String>,
}

/// A translation in the shape the index stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub content_type: ContentType,
    pub id: i64,
    pub kb_locale_id: i64,
    /// Category used for scoped searches; knowledge base translations have none
    pub scope_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Full-text search service
pub trait FullTextEngine {
    /// `false` while the engine is down or switched off
    fn enabled(&self) -> bool;

    fn search(
        &self,
        query: &str,
        indexes: &[ContentType],
        options: &SearchOptions,
    ) -> Result<Vec<RawHit>, IndexError>;
}
