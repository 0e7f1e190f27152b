//! Category hierarchy with per-locale content visibility

use ahash::{AHashMap, AHashSet};

use super::types::{Answer, Category, Visibility};

/// Category hierarchy of one or more knowledge bases.
///
/// A category has internal (or public) content in a locale when it, or any of
/// its descendants, owns an answer visible at that level with a translation in
/// that locale.
#[derive(Debug, Default)]
pub struct CategoryTree {
    parents: AHashMap<i64, Option<i64>>,
    children: AHashMap<i64, Vec<i64>>,
    internal_locales: AHashMap<i64, AHashSet<i64>>,
    public_locales: AHashMap<i64, AHashSet<i64>>,
}

impl CategoryTree {
    pub fn new(categories: &[Category], answers: &[Answer]) -> Self {
        let mut tree = Self::default();

        for category in categories {
            tree.parents.insert(category.id, category.parent_id);
            if let Some(parent) = category.parent_id {
                tree.children.entry(parent).or_default().push(category.id);
            }
        }

        for answer in answers {
            let internal = answer.state.visible_internally();
            let public = answer.state.visible_publicly();
            if !internal && !public {
                continue;
            }

            for category_id in tree.self_with_ancestor_ids(answer.category_id) {
                for translation in &answer.translations {
                    if internal {
                        tree.internal_locales
                            .entry(category_id)
                            .or_default()
                            .insert(translation.kb_locale_id);
                    }
                    if public {
                        tree.public_locales
                            .entry(category_id)
                            .or_default()
                            .insert(translation.kb_locale_id);
                    }
                }
            }
        }

        tree
    }

    pub fn contains(&self, category_id: i64) -> bool {
        self.parents.contains_key(&category_id)
    }

    /// The category followed by its ancestors, nearest first
    pub fn self_with_ancestor_ids(&self, category_id: i64) -> Vec<i64> {
        let mut chain = vec![category_id];
        let mut current = category_id;

        while let Some(Some(parent)) = self.parents.get(&current) {
            // guards against corrupt parent cycles
            if chain.contains(parent) {
                break;
            }
            chain.push(*parent);
            current = *parent;
        }

        chain
    }

    /// The category followed by all of its descendants, depth first
    pub fn self_with_children_ids(&self, category_id: i64) -> Vec<i64> {
        let mut seen = AHashSet::new();
        let mut ids = Vec::new();
        let mut stack = vec![category_id];

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            ids.push(id);
            if let Some(children) = self.children.get(&id) {
                stack.extend(children.iter().rev());
            }
        }

        ids
    }

    pub fn has_content(&self, category_id: i64, visibility: Visibility, kb_locale_id: i64) -> bool {
        let locales = match visibility {
            Visibility::Internal => &self.internal_locales,
            Visibility::Public => &self.public_locales,
        };

        locales
            .get(&category_id)
            .is_some_and(|set| set.contains(&kb_locale_id))
    }

    pub fn internal_content(&self, category_id: i64, kb_locale_id: i64) -> bool {
        self.has_content(category_id, Visibility::Internal, kb_locale_id)
    }

    pub fn public_content(&self, category_id: i64, kb_locale_id: i64) -> bool {
        self.has_content(category_id, Visibility::Public, kb_locale_id)
    }
}
