mod common;

use std::sync::Arc;

use ahash::AHashSet;
use common::{sorted_ids, Fixture};
use kbsearch::content::{
    Caller, ContentType, Flavor, InternalAssets, InternalAssetsProvider, EDITOR_PERMISSION,
    READER_PERMISSION,
};
use kbsearch::search::{Pagination, SearchParams};
use kbsearch::Result;

fn editor() -> Caller {
    Caller::new(1).with_permission(EDITOR_PERMISSION)
}

fn reader() -> Caller {
    Caller::new(2).with_permission(READER_PERMISSION)
}

fn id_set(hits: &[kbsearch::search::SearchHit]) -> AHashSet<i64> {
    hits.iter().map(|hit| hit.id).collect()
}

/// Allow-list provider that ignores the caller
struct FixedAssets(InternalAssets);

impl InternalAssetsProvider for FixedAssets {
    fn internal_assets(
        &self,
        _caller: Option<&Caller>,
        _knowledge_base_ids: &[i64],
    ) -> Result<InternalAssets> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_published_and_internal_answers_by_caller() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    let public = backends
        .searcher(SearchParams::new().knowledge_base(1).index(ContentType::AnswerTranslation))
        .unwrap();
    assert_eq!(sorted_ids(&public.search("printer", None, None).unwrap()), vec![400]);

    let agent = backends
        .searcher(
            SearchParams::new()
                .knowledge_base(1)
                .index(ContentType::AnswerTranslation)
                .flavor(Flavor::Agent),
        )
        .unwrap();
    assert_eq!(
        sorted_ids(&agent.search("printer", Some(&reader()), None).unwrap()),
        vec![400, 500]
    );

    // an agent without knowledge base permissions only sees published answers
    let nobody = Caller::new(3);
    assert_eq!(
        sorted_ids(&agent.search("printer", Some(&nobody), None).unwrap()),
        vec![400]
    );
}

#[test]
fn test_reader_permission_needs_agent_flavor() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    let public = backends
        .searcher(SearchParams::new().knowledge_base(1).index(ContentType::AnswerTranslation))
        .unwrap();
    assert_eq!(
        sorted_ids(&public.search("printer", Some(&reader()), None).unwrap()),
        vec![400]
    );
}

#[test]
fn test_granular_permissions_follow_category_roles() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();
    let support = Caller::new(4).with_role("Support");

    let agent = backends
        .searcher(SearchParams::new().knowledge_base(6).flavor(Flavor::Agent))
        .unwrap();
    assert!(agent.use_internal_assets().unwrap());
    assert_eq!(
        sorted_ids(&agent.search("printer", Some(&support), None).unwrap()),
        vec![700, 800, 900]
    );

    // the public site ignores the allow-lists
    let public = backends
        .searcher(SearchParams::new().knowledge_base(6))
        .unwrap();
    assert!(!public.use_internal_assets().unwrap());
    assert_eq!(
        sorted_ids(&public.search("printer", Some(&support), None).unwrap()),
        vec![700, 800, 1100, 1200]
    );
}

#[test]
fn test_allow_list_overrides_answer_state() {
    let fixture = Fixture::new(true);
    let backends =
        fixture.backends_with_assets(Arc::new(FixedAssets(InternalAssets::new([9], []))));

    let agent = backends
        .searcher(SearchParams::new().knowledge_base(6).flavor(Flavor::Agent))
        .unwrap();

    // answer 8 is published but not on the list
    let hits = agent.search("printer", Some(&editor()), None).unwrap();
    assert_eq!(sorted_ids(&hits), vec![900]);
}

#[test]
fn test_index_restriction() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    // answer 4 mentions the help desk in its body
    let everything = backends.searcher(SearchParams::new()).unwrap();
    let hits = everything.search("help", None, None).unwrap();
    assert!(hits.iter().any(|hit| hit.id == 400));

    let knowledge_bases_only = backends
        .searcher(SearchParams::new().index(ContentType::KnowledgeBaseTranslation))
        .unwrap();
    let hits = knowledge_bases_only.search("help", None, None).unwrap();
    assert_eq!(sorted_ids(&hits), vec![100]);
    assert!(hits
        .iter()
        .all(|hit| hit.content_type == ContentType::KnowledgeBaseTranslation));
}

#[test]
fn test_locale_containment() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    let german = backends
        .searcher(SearchParams::new().knowledge_base(1).locale_code("de-de"))
        .unwrap();
    assert_eq!(
        sorted_ids(&german.search("drucker", Some(&editor()), None).unwrap()),
        vec![401]
    );

    let english = backends
        .searcher(SearchParams::new().knowledge_base(1).locale_code("en-us"))
        .unwrap();
    let german_translations: AHashSet<i64> = [101, 201, 401].into_iter().collect();
    for query in ["printer", "drucker", "help", ""] {
        let hits = english.search(query, Some(&editor()), None).unwrap();
        assert!(
            id_set(&hits).is_disjoint(&german_translations),
            "{:?} leaked a de-de translation",
            query
        );
    }
}

#[test]
fn test_visibility_is_monotonic() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    let public = backends
        .searcher(SearchParams::new().knowledge_base(1))
        .unwrap()
        .search("printer", None, None)
        .unwrap();
    let agent = backends
        .searcher(SearchParams::new().knowledge_base(1).flavor(Flavor::Agent))
        .unwrap();
    let internal = agent.search("printer", Some(&reader()), None).unwrap();
    let everything = agent.search("printer", Some(&editor()), None).unwrap();

    assert_eq!(sorted_ids(&public), vec![400]);
    assert_eq!(sorted_ids(&internal), vec![300, 400, 500]);
    assert!(id_set(&public).is_subset(&id_set(&internal)));
    assert!(id_set(&internal).is_subset(&id_set(&everything)));
}

#[test]
fn test_pagination_is_idempotent() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();
    let search = backends
        .searcher(SearchParams::new().knowledge_base(1))
        .unwrap();

    let first = search
        .search("printer", Some(&editor()), Some(Pagination::page(1, 2)))
        .unwrap();
    let again = search
        .search("printer", Some(&editor()), Some(Pagination::page(1, 2)))
        .unwrap();
    let second = search
        .search("printer", Some(&editor()), Some(Pagination::page(2, 2)))
        .unwrap();

    assert_eq!(first, again);
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert!(id_set(&first).is_disjoint(&id_set(&second)));
}

#[test]
fn test_limit_with_pages_walks_every_hit() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();
    let search = backends
        .searcher(SearchParams::new().knowledge_base(1).limit(1))
        .unwrap();

    let mut seen = Vec::new();
    for page in 1..=3 {
        let hits = search
            .search("printer", Some(&editor()), Some(Pagination::page(page, 1)))
            .unwrap();
        assert_eq!(hits.len(), 1, "page {} is empty", page);
        seen.extend(hits.into_iter().map(|hit| hit.id));
    }

    seen.sort_unstable();
    assert_eq!(seen, vec![300, 400, 500]);
}

#[test]
fn test_highlights_on_answer_body() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    let hits = backends
        .searcher(SearchParams::new().index(ContentType::AnswerTranslation))
        .unwrap()
        .search("tray", None, None)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].highlights["body"].contains("<b>tray</b>"));

    let plain = backends
        .searcher(
            SearchParams::new()
                .index(ContentType::AnswerTranslation)
                .highlight(false),
        )
        .unwrap()
        .search("tray", None, None)
        .unwrap();
    assert!(plain[0].highlights.is_empty());
}

#[test]
fn test_scope_on_engine_path() {
    let fixture = Fixture::new(true);
    let backends = fixture.backends();

    // category 3 holds answer 5 only
    let scoped = backends
        .searcher(SearchParams::new().scope(3).flavor(Flavor::Agent))
        .unwrap();
    let hits = scoped.search("printer", Some(&editor()), None).unwrap();
    assert_eq!(sorted_ids(&hits), vec![500]);
}

#[test]
fn test_fallback_orders_by_recency() {
    let fixture = Fixture::new(false);
    let backends = fixture.backends();

    let hits = backends
        .searcher(SearchParams::new().knowledge_base(1).index(ContentType::AnswerTranslation))
        .unwrap()
        .search("printer", Some(&editor()), None)
        .unwrap();

    let ids: Vec<i64> = hits.iter().map(|hit| hit.id).collect();
    assert_eq!(ids, vec![500, 400]);
}

#[test]
fn test_fallback_with_scope_is_always_empty() {
    let fixture = Fixture::new(false);
    let backends = fixture.backends();

    let scoped = backends.searcher(SearchParams::new().scope(2)).unwrap();
    for query in ["printer", "jams", "", "%"] {
        assert!(scoped
            .search(query, Some(&editor()), None)
            .unwrap()
            .is_empty());
    }
}
