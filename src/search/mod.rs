//! Knowledge base search orchestration
//!
//! A [`KnowledgeBaseSearch`] resolves the knowledge bases, locales and scope of
//! one request, asks the full-text engine (or the relational fallback when the
//! engine is unavailable) for candidates, and keeps only the hits the caller is
//! allowed to see. The permission filter is the authoritative gate: the engine
//! index may lag behind the database.

mod filter;
mod params;

pub use params::{KnowledgeBaseSelection, LocaleSelector, Pagination, SearchParams};

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::content::{
    Answer, Caller, Category, ContentRepository, ContentType, FallbackQuery, Flavor,
    InternalAssetsProvider, KbLocale, KnowledgeBase, OrderBy, SortDirection,
};
use crate::engine::{FieldsByIndex, FullTextEngine, SearchOptions, TermsClause};
use crate::error::Result;
use filter::{AccessRule, LocaleSet};

const ANSWER_QUERY_FIELDS: &[&str] = &["title", "body", "attachment", "tags"];
const ANSWER_HIGHLIGHT_FIELDS: &[&str] = &["title", "body", "tags"];
const TITLE_FIELDS: &[&str] = &["title"];

/// One visible search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Translation id
    pub id: i64,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, String>,
}

/// Engine or fallback hit with a coerced id, not yet authorized
#[derive(Debug)]
struct Candidate {
    id: i64,
    type_tag: String,
    highlights: BTreeMap<String, String>,
}

/// Collaborators shared by every search request
#[derive(Clone)]
pub struct SearchBackends {
    pub repository: Arc<dyn ContentRepository>,
    pub engine: Arc<dyn FullTextEngine>,
    pub assets: Arc<dyn InternalAssetsProvider>,
    pub settings: SearchConfig,
}

impl SearchBackends {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        engine: Arc<dyn FullTextEngine>,
        assets: Arc<dyn InternalAssetsProvider>,
        settings: SearchConfig,
    ) -> Self {
        Self {
            repository,
            engine,
            assets,
            settings,
        }
    }

    /// Start a search request. Validates `params` and resolves the scope subtree.
    pub fn searcher(&self, params: SearchParams) -> Result<KnowledgeBaseSearch<'_>> {
        KnowledgeBaseSearch::new(self, params)
    }
}

/// State of a single search request. Lookups are computed on first use and
/// kept for the lifetime of the request.
pub struct KnowledgeBaseSearch<'a> {
    backends: &'a SearchBackends,
    params: SearchParams,
    indexes: Vec<ContentType>,
    scope_ids: Option<Vec<i64>>,
    knowledge_bases: OnceCell<Vec<KnowledgeBase>>,
    kb_locales: OnceCell<Vec<KbLocale>>,
    kb_locale_ids: OnceCell<Vec<i64>>,
    locale_set: OnceCell<LocaleSet>,
    categories: OnceCell<Vec<Category>>,
    answers: OnceCell<Vec<Answer>>,
}

impl<'a> KnowledgeBaseSearch<'a> {
    fn new(backends: &'a SearchBackends, params: SearchParams) -> Result<Self> {
        params.validate()?;

        let scope_ids = match params.scope {
            Some(category_id) => {
                let ids = backends.repository.category_subtree_ids(category_id)?;
                if ids.is_empty() {
                    tracing::warn!("Scope category {} does not exist", category_id);
                }
                Some(ids)
            }
            None => None,
        };

        Ok(Self {
            backends,
            indexes: params.resolved_indexes(),
            params,
            scope_ids,
            knowledge_bases: OnceCell::new(),
            kb_locales: OnceCell::new(),
            kb_locale_ids: OnceCell::new(),
            locale_set: OnceCell::new(),
            categories: OnceCell::new(),
            answers: OnceCell::new(),
        })
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn indexes(&self) -> &[ContentType] {
        &self.indexes
    }

    /// The scope category and all of its descendants
    pub fn scope_ids(&self) -> Option<&[i64]> {
        self.scope_ids.as_deref()
    }

    pub fn knowledge_bases(&self) -> Result<&[KnowledgeBase]> {
        if let Some(cached) = self.knowledge_bases.get() {
            return Ok(cached.as_slice());
        }

        let repository = &self.backends.repository;
        let knowledge_bases = match &self.params.knowledge_bases {
            KnowledgeBaseSelection::Active => repository.active_knowledge_bases()?,
            KnowledgeBaseSelection::Only(ids) => repository.knowledge_bases(ids)?,
        };

        Ok(self.knowledge_bases.get_or_init(|| knowledge_bases).as_slice())
    }

    fn knowledge_base_ids(&self) -> Result<Vec<i64>> {
        Ok(self.knowledge_bases()?.iter().map(|kb| kb.id).collect())
    }

    pub fn kb_locales(&self) -> Result<&[KbLocale]> {
        if let Some(cached) = self.kb_locales.get() {
            return Ok(cached.as_slice());
        }

        let locales = match &self.params.locale {
            LocaleSelector::Locale(locale) => vec![locale.clone()],
            LocaleSelector::Code(code) => self
                .backends
                .repository
                .locales(&self.knowledge_base_ids()?, Some(code))?,
            LocaleSelector::Any => self
                .backends
                .repository
                .locales(&self.knowledge_base_ids()?, None)?,
        };

        Ok(self.kb_locales.get_or_init(|| locales).as_slice())
    }

    pub fn kb_locale_ids(&self) -> Result<&[i64]> {
        if let Some(cached) = self.kb_locale_ids.get() {
            return Ok(cached.as_slice());
        }
        let ids = self.kb_locales()?.iter().map(|locale| locale.id).collect();
        Ok(self.kb_locale_ids.get_or_init(|| ids).as_slice())
    }

    fn locale_set(&self) -> Result<&LocaleSet> {
        if let Some(cached) = self.locale_set.get() {
            return Ok(cached);
        }
        let set = LocaleSet::new(self.kb_locales()?);
        Ok(self.locale_set.get_or_init(|| set))
    }

    fn categories(&self) -> Result<&[Category]> {
        if let Some(cached) = self.categories.get() {
            return Ok(cached.as_slice());
        }
        let categories = self
            .backends
            .repository
            .categories(&self.knowledge_base_ids()?)?;
        Ok(self.categories.get_or_init(|| categories).as_slice())
    }

    fn answers(&self) -> Result<&[Answer]> {
        if let Some(cached) = self.answers.get() {
            return Ok(cached.as_slice());
        }
        let answers = self
            .backends
            .repository
            .answers(&self.knowledge_base_ids()?)?;
        Ok(self.answers.get_or_init(|| answers).as_slice())
    }

    /// Agent searches over knowledge bases with granular permissions use
    /// per-caller allow-lists instead of answer states
    pub fn use_internal_assets(&self) -> Result<bool> {
        Ok(self.params.flavor == Flavor::Agent
            && self
                .knowledge_bases()?
                .iter()
                .any(|kb| kb.granular_permissions))
    }

    fn highlight_enabled(&self) -> bool {
        self.params.highlight_enabled && self.backends.settings.highlight_enabled
    }

    /// Run the search and return the visible hits in engine (or fallback) order
    pub fn search(
        &self,
        query: &str,
        caller: Option<&Caller>,
        pagination: Option<Pagination>,
    ) -> Result<Vec<SearchHit>> {
        let candidates = self.raw_results(query, pagination.as_ref())?;
        let raw_count = candidates.len();
        let filtered = self.filter_results(candidates, caller)?;

        let results = if let Some(pagination) = pagination {
            pagination.apply(filtered)
        } else if let Some(limit) = self.params.limit {
            filtered.into_iter().take(limit).collect()
        } else {
            filtered
        };

        tracing::debug!(
            "Search {:?}: {} candidates, {} returned",
            query,
            raw_count,
            results.len()
        );

        Ok(results)
    }

    /// Options document sent to the full-text engine
    pub fn options(&self, pagination: Option<&Pagination>) -> Result<SearchOptions> {
        let mut options = SearchOptions::default();

        options.push_must(TermsClause::new(
            "kb_locale_id",
            self.kb_locale_ids()?.iter().copied(),
        ));

        if let Some(scope_ids) = &self.scope_ids {
            options.push_must(TermsClause::new("scope_id", scope_ids.iter().copied()));
        }

        // agent searches keep the engine's default field weighting
        if self.params.flavor != Flavor::Agent {
            options.query_fields_by_indexes = Some(fields_by_index(ANSWER_QUERY_FIELDS));
        }

        if self.highlight_enabled() {
            options.highlight_fields_by_indexes = Some(fields_by_index(ANSWER_HIGHLIGHT_FIELDS));
        }

        match (self.params.from, self.params.limit, pagination) {
            (Some(from), Some(limit), _) => {
                options.from = Some(from);
                options.limit = Some(limit);
            }
            (_, _, Some(pagination)) => {
                // over-fetch so the page can still fill up after permission filtering
                let overfetch = pagination
                    .limit
                    .saturating_mul(self.backends.settings.overfetch_multiplier);
                options.from = Some(0);
                options.limit = Some(overfetch.max(pagination.offset + pagination.limit));
            }
            (None, Some(limit), None) => {
                options.from = Some(0);
                options.limit = Some(limit);
            }
            _ => {}
        }

        for order in &self.params.order_by {
            options.sort_by.push(order.field.clone());
            options.order_by.push(order.direction);
        }

        options.fulltext = true;

        Ok(options)
    }

    fn raw_results(&self, query: &str, pagination: Option<&Pagination>) -> Result<Vec<Candidate>> {
        if !self.backends.engine.enabled() {
            tracing::debug!("Full-text engine unavailable, using relational fallback");
            return self.search_fallback(query);
        }

        let options = self.options(pagination)?;
        let hits = self.backends.engine.search(query, &self.indexes, &options)?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| match hit.id.as_i64() {
                Some(id) => Some(Candidate {
                    id,
                    type_tag: hit.type_tag,
                    highlights: hit.highlights,
                }),
                None => {
                    tracing::warn!("Dropping {} hit with invalid id {:?}", hit.type_tag, hit.id);
                    None
                }
            })
            .collect())
    }

    fn search_fallback(&self, query: &str) -> Result<Vec<Candidate>> {
        let default_order = [OrderBy::new("updated_at", SortDirection::Desc)];
        let order = if self.params.order_by.is_empty() {
            &default_order[..]
        } else {
            &self.params.order_by[..]
        };

        let fallback = FallbackQuery {
            text: query,
            scope_ids: self.scope_ids.as_deref(),
            kb_locale_ids: self.kb_locale_ids()?,
            order,
        };

        let mut candidates = Vec::new();
        for &content_type in &self.indexes {
            let ids = self
                .backends
                .repository
                .fallback_search(content_type, &fallback)?;
            candidates.extend(ids.into_iter().map(|id| Candidate {
                id,
                type_tag: content_type.tag().to_string(),
                highlights: BTreeMap::new(),
            }));
        }

        Ok(candidates)
    }

    fn access_rule(&self, caller: Option<&Caller>) -> Result<AccessRule> {
        if self.use_internal_assets()? {
            let assets = self
                .backends
                .assets
                .internal_assets(caller, &self.knowledge_base_ids()?)?;
            return Ok(AccessRule::AllowList(assets));
        }

        Ok(AccessRule::coarse(caller, self.params.flavor))
    }

    fn translation_ids_for_type(
        &self,
        content_type: ContentType,
        rule: &AccessRule,
    ) -> Result<AHashSet<i64>> {
        let locales = self.locale_set()?;
        Ok(match content_type {
            ContentType::AnswerTranslation => {
                filter::answer_translation_ids(rule, self.answers()?, locales)
            }
            ContentType::CategoryTranslation => {
                filter::category_translation_ids(rule, self.categories()?, self.answers()?, locales)
            }
            ContentType::KnowledgeBaseTranslation => {
                filter::knowledge_base_translation_ids(self.knowledge_bases()?, locales)
            }
        })
    }

    /// Keep the candidates the caller may see, preserving their order
    fn filter_results(
        &self,
        candidates: Vec<Candidate>,
        caller: Option<&Caller>,
    ) -> Result<Vec<SearchHit>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let rule = self.access_rule(caller)?;
        let mut authorized: AHashMap<ContentType, AHashSet<i64>> = AHashMap::new();
        let mut hits = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let content_type = match ContentType::from_tag(&candidate.type_tag) {
                Some(ct) if self.indexes.contains(&ct) => ct,
                _ => {
                    tracing::debug!("Dropping hit of type {}", candidate.type_tag);
                    continue;
                }
            };

            if !authorized.contains_key(&content_type) {
                let ids = self.translation_ids_for_type(content_type, &rule)?;
                authorized.insert(content_type, ids);
            }

            if authorized
                .get(&content_type)
                .is_some_and(|ids| ids.contains(&candidate.id))
            {
                hits.push(SearchHit {
                    id: candidate.id,
                    content_type,
                    highlights: candidate.highlights,
                });
            }
        }

        Ok(hits)
    }
}

fn fields_by_index(answer_fields: &[&str]) -> FieldsByIndex {
    ContentType::ALL
        .into_iter()
        .map(|content_type| {
            let fields = match content_type {
                ContentType::AnswerTranslation => answer_fields,
                ContentType::CategoryTranslation | ContentType::KnowledgeBaseTranslation => {
                    TITLE_FIELDS
                }
            };
            (
                content_type.tag().to_string(),
                fields.iter().map(|f| f.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{EDITOR_PERMISSION, READER_PERMISSION};
    use crate::engine::{IndexError, RawHit, RawId};
    use crate::storage::{ContentDump, Database, SqliteRepository};
    use std::cell::RefCell;

    struct FakeEngine {
        enabled: bool,
        hits: Vec<RawHit>,
        seen: RefCell<Vec<SearchOptions>>,
    }

    impl FakeEngine {
        fn new(hits: Vec<RawHit>) -> Arc<Self> {
            Arc::new(Self {
                enabled: true,
                hits,
                seen: RefCell::new(Vec::new()),
            })
        }

        fn disabled() -> Arc<Self> {
            Arc::new(Self {
                enabled: false,
                hits: Vec::new(),
                seen: RefCell::new(Vec::new()),
            })
        }
    }

    impl FullTextEngine for FakeEngine {
        fn enabled(&self) -> bool {
            self.enabled
        }

        fn search(
            &self,
            _query: &str,
            _indexes: &[ContentType],
            options: &SearchOptions,
        ) -> std::result::Result<Vec<RawHit>, IndexError> {
            self.seen.borrow_mut().push(options.clone());
            Ok(self.hits.clone())
        }
    }

    fn hit(id: i64, content_type: ContentType) -> RawHit {
        RawHit {
            id: RawId::Int(id),
            type_tag: content_type.tag().to_string(),
            highlights: BTreeMap::new(),
        }
    }

    fn repository() -> Arc<SqliteRepository> {
        let db = Database::in_memory().unwrap();
        let dump: ContentDump = serde_json::from_value(serde_json::json!({
            "knowledge_bases": [{
                "id": 1, "name": "Help",
                "locales": [{"id": 10, "locale": "en-us"}, {"id": 11, "locale": "de-de"}],
                "translations": [{"id": 100, "kb_locale_id": 10, "title": "Help Center"}]
            }],
            "categories": [
                {"id": 2, "knowledge_base_id": 1,
                 "translations": [{"id": 200, "kb_locale_id": 10, "title": "Printing"},
                                  {"id": 201, "kb_locale_id": 11, "title": "Drucken"}]},
                {"id": 6, "knowledge_base_id": 1, "parent_id": 2}
            ],
            "answers": [
                {"id": 3, "category_id": 2, "state": "published",
                 "translations": [{"id": 300, "kb_locale_id": 10, "title": "Printer jams", "updated_at": 1},
                                  {"id": 301, "kb_locale_id": 11, "title": "Papierstau", "updated_at": 2}]},
                {"id": 4, "category_id": 6, "state": "internal",
                 "translations": [{"id": 400, "kb_locale_id": 10, "title": "Printer drivers", "updated_at": 3}]},
                {"id": 5, "category_id": 2, "state": "draft",
                 "translations": [{"id": 500, "kb_locale_id": 10, "title": "Printer roadmap", "updated_at": 4}]}
            ]
        }))
        .unwrap();
        db.import(&dump).unwrap();
        Arc::new(SqliteRepository::new(db))
    }

    fn backends(engine: Arc<FakeEngine>) -> SearchBackends {
        let repository = repository();
        SearchBackends::new(
            repository.clone(),
            engine,
            repository,
            SearchConfig::default(),
        )
    }

    fn ids(hits: &[SearchHit]) -> Vec<i64> {
        hits.iter().map(|hit| hit.id).collect()
    }

    fn all_answers() -> Vec<RawHit> {
        vec![
            hit(500, ContentType::AnswerTranslation),
            hit(400, ContentType::AnswerTranslation),
            hit(301, ContentType::AnswerTranslation),
            hit(300, ContentType::AnswerTranslation),
        ]
    }

    #[test]
    fn test_public_options_document() {
        let engine = FakeEngine::new(vec![]);
        let backends = backends(engine.clone());
        let search = backends
            .searcher(SearchParams::new().scope(2).order_by(OrderBy::new("title", SortDirection::Asc)))
            .unwrap();

        search.search("printer", None, Some(Pagination::page(1, 10))).unwrap();

        let seen = engine.seen.borrow();
        let options = &seen[0];
        assert_eq!(options.must()[0], TermsClause::new("kb_locale_id", [10, 11]));
        assert_eq!(options.must()[1], TermsClause::new("scope_id", [2, 6]));
        let query_fields = options.query_fields_by_indexes.as_ref().unwrap();
        assert_eq!(
            query_fields[ContentType::AnswerTranslation.tag()],
            vec!["title", "body", "attachment", "tags"]
        );
        assert_eq!(query_fields[ContentType::KnowledgeBaseTranslation.tag()], vec!["title"]);
        assert!(options.highlight_fields_by_indexes.is_some());
        assert_eq!(options.from, Some(0));
        assert_eq!(options.limit, Some(990));
        assert_eq!(options.sort_by, vec!["title"]);
        assert_eq!(options.order_by, vec![SortDirection::Asc]);
        assert!(options.fulltext);
    }

    #[test]
    fn test_agent_options_omit_field_weighting() {
        let backends = backends(FakeEngine::new(vec![]));
        let search = backends
            .searcher(
                SearchParams::new()
                    .flavor(Flavor::Agent)
                    .highlight(false)
                    .limit(5)
                    .offset(20),
            )
            .unwrap();

        let options = search.options(None).unwrap();
        assert!(options.query_fields_by_indexes.is_none());
        assert!(options.highlight_fields_by_indexes.is_none());
        assert_eq!(options.from, Some(20));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.must().len(), 1);
    }

    #[test]
    fn test_limit_without_from_keeps_page_overfetch() {
        let backends = backends(FakeEngine::new(vec![]));
        let search = backends
            .searcher(SearchParams::new().limit(5))
            .unwrap();

        let paged = search.options(Some(&Pagination::page(2, 5))).unwrap();
        assert_eq!(paged.from, Some(0));
        assert_eq!(paged.limit, Some(495));

        let unpaged = search.options(None).unwrap();
        assert_eq!(unpaged.from, Some(0));
        assert_eq!(unpaged.limit, Some(5));

        let windowed = backends
            .searcher(SearchParams::new().limit(5).offset(10))
            .unwrap()
            .options(Some(&Pagination::page(2, 5)))
            .unwrap();
        assert_eq!(windowed.from, Some(10));
        assert_eq!(windowed.limit, Some(5));
    }

    #[test]
    fn test_engine_ids_are_coerced() {
        let mut hits = vec![
            RawHit {
                id: RawId::Text("300".to_string()),
                type_tag: ContentType::AnswerTranslation.tag().to_string(),
                highlights: BTreeMap::new(),
            },
            RawHit {
                id: RawId::Text("not-a-number".to_string()),
                type_tag: ContentType::AnswerTranslation.tag().to_string(),
                highlights: BTreeMap::new(),
            },
        ];
        hits.push(RawHit {
            id: RawId::Int(100),
            type_tag: "Ticket::Article".to_string(),
            highlights: BTreeMap::new(),
        });

        let backends = backends(FakeEngine::new(hits));
        let results = backends
            .searcher(SearchParams::new())
            .unwrap()
            .search("printer", None, None)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 300);
        assert_eq!(results[0].content_type, ContentType::AnswerTranslation);
    }

    #[test]
    fn test_answer_visibility_by_caller() {
        let backends = backends(FakeEngine::new(all_answers()));
        let public = backends.searcher(SearchParams::new()).unwrap();
        assert_eq!(ids(&public.search("printer", None, None).unwrap()), vec![301, 300]);

        let agent = backends
            .searcher(SearchParams::new().flavor(Flavor::Agent))
            .unwrap();
        let reader = Caller::new(1).with_permission(READER_PERMISSION);
        assert_eq!(
            ids(&agent.search("printer", Some(&reader), None).unwrap()),
            vec![400, 301, 300]
        );

        let nobody = Caller::new(2);
        assert_eq!(
            ids(&agent.search("printer", Some(&nobody), None).unwrap()),
            vec![301, 300]
        );

        let editor = Caller::new(3).with_permission(EDITOR_PERMISSION);
        assert_eq!(
            ids(&public.search("printer", Some(&editor), None).unwrap()),
            vec![500, 400, 301, 300]
        );
    }

    #[test]
    fn test_locale_code_limits_results() {
        let backends = backends(FakeEngine::new(all_answers()));
        let search = backends
            .searcher(SearchParams::new().locale_code("de-de"))
            .unwrap();

        assert_eq!(search.kb_locale_ids().unwrap(), &[11]);
        assert_eq!(ids(&search.search("druck", None, None).unwrap()), vec![301]);
    }

    #[test]
    fn test_index_restriction_drops_other_types() {
        let mut hits = all_answers();
        hits.push(hit(100, ContentType::KnowledgeBaseTranslation));

        let backends = backends(FakeEngine::new(hits));
        let search = backends
            .searcher(SearchParams::new().index(ContentType::KnowledgeBaseTranslation))
            .unwrap();

        let results = search.search("help", None, None).unwrap();
        assert_eq!(ids(&results), vec![100]);
        assert_eq!(results[0].content_type, ContentType::KnowledgeBaseTranslation);
    }

    #[test]
    fn test_pagination_slices_filtered_hits() {
        let backends = backends(FakeEngine::new(all_answers()));
        let editor = Caller::new(1).with_permission(EDITOR_PERMISSION);
        let search = backends.searcher(SearchParams::new()).unwrap();

        let page = search
            .search("printer", Some(&editor), Some(Pagination::page(2, 3)))
            .unwrap();
        assert_eq!(ids(&page), vec![300]);

        let limited = backends
            .searcher(SearchParams::new().limit(2))
            .unwrap()
            .search("printer", Some(&editor), None)
            .unwrap();
        assert_eq!(ids(&limited), vec![500, 400]);
    }

    #[test]
    fn test_fallback_orders_by_recency() {
        let backends = backends(FakeEngine::disabled());
        let search = backends
            .searcher(SearchParams::new().index(ContentType::AnswerTranslation))
            .unwrap();

        let results = search.search("printer", None, None).unwrap();
        assert_eq!(ids(&results), vec![300]);

        let editor = Caller::new(1).with_permission(EDITOR_PERMISSION);
        let results = search.search("printer", Some(&editor), None).unwrap();
        assert_eq!(ids(&results), vec![500, 400, 300]);
    }

    #[test]
    fn test_fallback_with_scope_is_empty() {
        let backends = backends(FakeEngine::disabled());
        let editor = Caller::new(1).with_permission(EDITOR_PERMISSION);
        let search = backends.searcher(SearchParams::new().scope(2)).unwrap();

        assert_eq!(search.scope_ids(), Some(&[2, 6][..]));
        assert!(search.search("printer", Some(&editor), None).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let backends = backends(FakeEngine::new(vec![]));
        let params = SearchParams::new().order_by(OrderBy::new("body", SortDirection::Desc));
        assert!(backends.searcher(params).is_err());
    }
}
