//! Allow-lists for knowledge bases running with granular permissions

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::tree::CategoryTree;
use super::types::{Answer, Caller, Category, EDITOR_PERMISSION, READER_PERMISSION};
use crate::error::KbSearchError;

/// Access a role holds on a category. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryAccess {
    None,
    Reader,
    Editor,
}

impl CategoryAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryAccess::None => "none",
            CategoryAccess::Reader => "reader",
            CategoryAccess::Editor => "editor",
        }
    }

    /// Access that applies where no category in the chain carries an explicit entry
    pub fn default_for(caller: &Caller) -> Self {
        if caller.has_permission(EDITOR_PERMISSION) {
            CategoryAccess::Editor
        } else if caller.has_permission(READER_PERMISSION) {
            CategoryAccess::Reader
        } else {
            CategoryAccess::None
        }
    }
}

impl FromStr for CategoryAccess {
    type Err = KbSearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CategoryAccess::None),
            "reader" => Ok(CategoryAccess::Reader),
            "editor" => Ok(CategoryAccess::Editor),
            other => Err(KbSearchError::InvalidParams(format!(
                "Unknown category access '{}'",
                other
            ))),
        }
    }
}

/// Answer and category ids a caller may see under granular permissions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalAssets {
    answer_ids: AHashSet<i64>,
    category_ids: AHashSet<i64>,
}

impl InternalAssets {
    pub fn new(
        answer_ids: impl IntoIterator<Item = i64>,
        category_ids: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            answer_ids: answer_ids.into_iter().collect(),
            category_ids: category_ids.into_iter().collect(),
        }
    }

    /// Computes the allow-lists from explicit per-category access entries.
    ///
    /// `explicit` maps category ids to the strongest access any of the caller's
    /// roles holds there. Categories without an entry inherit from their nearest
    /// ancestor that has one, falling back to `default_access`.
    pub fn resolve(
        categories: &[Category],
        answers: &[Answer],
        explicit: &AHashMap<i64, CategoryAccess>,
        default_access: CategoryAccess,
    ) -> Self {
        let tree = CategoryTree::new(categories, &[]);

        let effective: AHashMap<i64, CategoryAccess> = categories
            .iter()
            .map(|category| {
                let access = tree
                    .self_with_ancestor_ids(category.id)
                    .into_iter()
                    .find_map(|id| explicit.get(&id).copied())
                    .unwrap_or(default_access);
                (category.id, access)
            })
            .collect();

        let category_ids = effective
            .iter()
            .filter(|(_, access)| **access >= CategoryAccess::Reader)
            .map(|(id, _)| *id);

        let answer_ids = answers
            .iter()
            .filter(|answer| match effective.get(&answer.category_id) {
                Some(CategoryAccess::Editor) => true,
                Some(CategoryAccess::Reader) => answer.state.visible_internally(),
                _ => false,
            })
            .map(|answer| answer.id);

        Self::new(answer_ids, category_ids)
    }

    pub fn all_answer_ids(&self) -> &AHashSet<i64> {
        &self.answer_ids
    }

    pub fn all_category_ids(&self) -> &AHashSet<i64> {
        &self.category_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AnswerState;

    fn category(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            knowledge_base_id: 1,
            parent_id,
            translations: vec![],
        }
    }

    fn answer(id: i64, category_id: i64, state: AnswerState) -> Answer {
        Answer {
            id,
            category_id,
            knowledge_base_id: 1,
            state,
            translations: vec![],
        }
    }

    #[test]
    fn test_default_access_from_permissions() {
        let editor = Caller::new(1).with_permission(EDITOR_PERMISSION);
        let reader = Caller::new(2).with_permission(READER_PERMISSION);
        assert_eq!(CategoryAccess::default_for(&editor), CategoryAccess::Editor);
        assert_eq!(CategoryAccess::default_for(&reader), CategoryAccess::Reader);
        assert_eq!(
            CategoryAccess::default_for(&Caller::new(3)),
            CategoryAccess::None
        );
    }

    #[test]
    fn test_explicit_entries_are_inherited() {
        let categories = vec![category(1, None), category(2, Some(1)), category(3, None)];
        let answers = vec![
            answer(10, 2, AnswerState::Draft),
            answer(11, 2, AnswerState::Internal),
            answer(12, 3, AnswerState::Published),
        ];
        let mut explicit = AHashMap::new();
        explicit.insert(1, CategoryAccess::Reader);
        explicit.insert(3, CategoryAccess::None);

        let assets =
            InternalAssets::resolve(&categories, &answers, &explicit, CategoryAccess::Editor);

        let mut categories: Vec<i64> = assets.all_category_ids().iter().copied().collect();
        categories.sort_unstable();
        assert_eq!(categories, vec![1, 2]);

        // reader access hides drafts, and category 3 is closed
        let answers: Vec<i64> = assets.all_answer_ids().iter().copied().collect();
        assert_eq!(answers, vec![11]);
    }

    #[test]
    fn test_editor_sees_drafts() {
        let categories = vec![category(1, None)];
        let answers = vec![answer(10, 1, AnswerState::Draft)];
        let assets = InternalAssets::resolve(
            &categories,
            &answers,
            &AHashMap::new(),
            CategoryAccess::Editor,
        );
        assert!(assets.all_answer_ids().contains(&10));
    }
}
