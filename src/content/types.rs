//! Knowledge base entities as the search layer sees them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KbSearchError;

/// Permission granting full access to every answer and category
pub const EDITOR_PERMISSION: &str = "knowledge_base.editor";

/// Permission granting access to internal content on the agent side
pub const READER_PERMISSION: &str = "knowledge_base.reader";

/// Columns that results may be ordered by, both in the index and in SQL
pub const ORDERABLE_FIELDS: &[&str] = &["id", "title", "created_at", "updated_at"];

/// Searchable content types. Every hit carries one of these as its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "KnowledgeBase::Answer::Translation")]
    AnswerTranslation,
    #[serde(rename = "KnowledgeBase::Category::Translation")]
    CategoryTranslation,
    #[serde(rename = "KnowledgeBase::Translation")]
    KnowledgeBaseTranslation,
}

impl ContentType {
    /// All content types, in default search order
    pub const ALL: [ContentType; 3] = [
        ContentType::AnswerTranslation,
        ContentType::CategoryTranslation,
        ContentType::KnowledgeBaseTranslation,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ContentType::AnswerTranslation => "KnowledgeBase::Answer::Translation",
            ContentType::CategoryTranslation => "KnowledgeBase::Category::Translation",
            ContentType::KnowledgeBaseTranslation => "KnowledgeBase::Translation",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.tag() == tag)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContentType {
    type Err = KbSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
            .ok_or_else(|| KbSearchError::InvalidParams(format!("Unknown index '{}'", s)))
    }
}

/// Where a search originates from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Agent console (internal staff)
    Agent,
    /// Public knowledge base site
    #[default]
    Public,
}

impl FromStr for Flavor {
    type Err = KbSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Flavor::Agent),
            "public" => Ok(Flavor::Public),
            other => Err(KbSearchError::InvalidParams(format!(
                "Flavor must be 'agent' or 'public', got '{}'",
                other
            ))),
        }
    }
}

/// Visibility level for the category content predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Internal,
    Public,
}

/// Publication state of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerState {
    Draft,
    Internal,
    Published,
    Archived,
}

impl AnswerState {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerState::Draft => "draft",
            AnswerState::Internal => "internal",
            AnswerState::Published => "published",
            AnswerState::Archived => "archived",
        }
    }

    /// Published answers are visible to agents too
    pub fn visible_internally(self) -> bool {
        matches!(self, AnswerState::Internal | AnswerState::Published)
    }

    pub fn visible_publicly(self) -> bool {
        self == AnswerState::Published
    }

    pub fn visible_at(self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Internal => self.visible_internally(),
            Visibility::Public => self.visible_publicly(),
        }
    }
}

impl FromStr for AnswerState {
    type Err = KbSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AnswerState::Draft),
            "internal" => Ok(AnswerState::Internal),
            "published" => Ok(AnswerState::Published),
            "archived" => Ok(AnswerState::Archived),
            other => Err(KbSearchError::InvalidParams(format!(
                "Unknown answer state '{}'",
                other
            ))),
        }
    }
}

/// Sort direction for ordered results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = KbSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(KbSearchError::InvalidParams(format!(
                "Sort direction must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

/// One `field => direction` entry of an ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn is_orderable(&self) -> bool {
        ORDERABLE_FIELDS.contains(&self.field.as_str())
    }
}

impl FromStr for OrderBy {
    type Err = KbSearchError;

    /// Parses `field` or `field:direction`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field, direction.parse()?),
            None => (s, SortDirection::Asc),
        };
        Ok(OrderBy::new(field.trim(), direction))
    }
}

/// Id and locale of a translation row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationRef {
    pub id: i64,
    pub kb_locale_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: i64,
    pub name: String,
    pub active: bool,
    /// Visibility for agents comes from an allow-list instead of answer state
    pub granular_permissions: bool,
    pub translations: Vec<TranslationRef>,
}

/// A language enabled in one knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbLocale {
    pub id: i64,
    pub knowledge_base_id: i64,
    /// Underlying system locale code, e.g. `en-us`
    pub locale: String,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub knowledge_base_id: i64,
    pub parent_id: Option<i64>,
    pub translations: Vec<TranslationRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub category_id: i64,
    pub knowledge_base_id: i64,
    pub state: AnswerState,
    pub translations: Vec<TranslationRef>,
}

/// Identity of whoever runs a search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Caller {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Permissions are hierarchical: `knowledge_base` grants `knowledge_base.editor`.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|held| {
            held == name
                || name
                    .strip_prefix(held.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}
