//! Knowledge base content model
//!
//! Entities are read-only snapshots owned by the persistence layer. The search
//! layer only reads them through [`ContentRepository`].

mod access;
mod repository;
mod tree;
mod types;

pub use access::{CategoryAccess, InternalAssets};
pub use repository::{ContentRepository, FallbackQuery, InternalAssetsProvider};
pub use tree::CategoryTree;
pub use types::{
    Answer, AnswerState, Caller, Category, ContentType, Flavor, KbLocale, KnowledgeBase, OrderBy,
    SortDirection, TranslationRef, Visibility, EDITOR_PERMISSION, ORDERABLE_FIELDS,
    READER_PERMISSION,
};
