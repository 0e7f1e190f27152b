//! Translation ids a caller may see, per content type

use ahash::{AHashMap, AHashSet};

use crate::content::{
    Answer, Caller, Category, CategoryTree, Flavor, InternalAssets, KbLocale, KnowledgeBase,
    TranslationRef, Visibility, EDITOR_PERMISSION, READER_PERMISSION,
};

/// How owners are authorized, strongest rule first
#[derive(Debug)]
pub(crate) enum AccessRule {
    /// Granular permissions: explicit answer and category allow-lists
    AllowList(InternalAssets),
    Editor,
    /// Agent readers: internal and published answers
    Internal,
    Public,
}

impl AccessRule {
    /// Rule for knowledge bases without granular permissions
    pub(crate) fn coarse(caller: Option<&Caller>, flavor: Flavor) -> Self {
        match caller {
            Some(caller) if caller.has_permission(EDITOR_PERMISSION) => AccessRule::Editor,
            Some(caller) if caller.has_permission(READER_PERMISSION) && flavor == Flavor::Agent => {
                AccessRule::Internal
            }
            _ => AccessRule::Public,
        }
    }

    fn allows_answer(&self, answer: &Answer) -> bool {
        match self {
            AccessRule::AllowList(assets) => assets.all_answer_ids().contains(&answer.id),
            AccessRule::Editor => true,
            AccessRule::Internal => answer.state.visible_internally(),
            AccessRule::Public => answer.state.visible_publicly(),
        }
    }
}

/// Resolved locale ids per knowledge base
#[derive(Debug, Default)]
pub(crate) struct LocaleSet {
    by_knowledge_base: AHashMap<i64, AHashSet<i64>>,
}

impl LocaleSet {
    pub(crate) fn new(locales: &[KbLocale]) -> Self {
        let mut by_knowledge_base: AHashMap<i64, AHashSet<i64>> = AHashMap::new();
        for locale in locales {
            by_knowledge_base
                .entry(locale.knowledge_base_id)
                .or_default()
                .insert(locale.id);
        }
        Self { by_knowledge_base }
    }

    pub(crate) fn contains(&self, knowledge_base_id: i64, kb_locale_id: i64) -> bool {
        self.by_knowledge_base
            .get(&knowledge_base_id)
            .is_some_and(|ids| ids.contains(&kb_locale_id))
    }

    fn translation_ids<'a>(
        &'a self,
        knowledge_base_id: i64,
        translations: &'a [TranslationRef],
    ) -> impl Iterator<Item = i64> + 'a {
        translations
            .iter()
            .filter(move |t| self.contains(knowledge_base_id, t.kb_locale_id))
            .map(|t| t.id)
    }
}

pub(crate) fn answer_translation_ids(
    rule: &AccessRule,
    answers: &[Answer],
    locales: &LocaleSet,
) -> AHashSet<i64> {
    answers
        .iter()
        .filter(|answer| rule.allows_answer(answer))
        .flat_map(|answer| locales.translation_ids(answer.knowledge_base_id, &answer.translations))
        .collect()
}

pub(crate) fn category_translation_ids(
    rule: &AccessRule,
    categories: &[Category],
    answers: &[Answer],
    locales: &LocaleSet,
) -> AHashSet<i64> {
    let visibility = match rule {
        AccessRule::AllowList(assets) => {
            return categories
                .iter()
                .filter(|category| assets.all_category_ids().contains(&category.id))
                .flat_map(|c| locales.translation_ids(c.knowledge_base_id, &c.translations))
                .collect();
        }
        AccessRule::Editor => {
            return categories
                .iter()
                .flat_map(|c| locales.translation_ids(c.knowledge_base_id, &c.translations))
                .collect();
        }
        AccessRule::Internal => Visibility::Internal,
        AccessRule::Public => Visibility::Public,
    };

    // a category only shows in locales where it leads to visible answers
    let tree = CategoryTree::new(categories, answers);
    categories
        .iter()
        .flat_map(|category| {
            category
                .translations
                .iter()
                .filter(|t| locales.contains(category.knowledge_base_id, t.kb_locale_id))
                .filter(|t| tree.has_content(category.id, visibility, t.kb_locale_id))
                .map(|t| t.id)
                .collect::<Vec<_>>()
        })
        .collect()
}

pub(crate) fn knowledge_base_translation_ids(
    knowledge_bases: &[KnowledgeBase],
    locales: &LocaleSet,
) -> AHashSet<i64> {
    knowledge_bases
        .iter()
        .filter(|kb| kb.active)
        .flat_map(|kb| locales.translation_ids(kb.id, &kb.translations))
        .collect()
}
