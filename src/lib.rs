//! kbsearch - Knowledge Base Search Orchestrator
//!
//! Resolves the knowledge bases, locales and category scope a caller searches in,
//! asks a full-text index (or a relational fallback when the index is disabled)
//! for candidate translations, and then drops every hit the caller is not
//! allowed to see before paginating the result.

pub mod cli;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod search;
pub mod storage;

pub use error::{KbSearchError, Result};
