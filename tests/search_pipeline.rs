//! End-to-end orchestration scenarios over in-process collaborators.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use approx::assert_relative_eq;
use coursefind::{
    CatalogSearch, CatalogSection, CourseHit, CourseMatcher, QueryEmbedder, SearchControls,
    SearchError, SearchService, SectionSource, NO_COURSES_MESSAGE,
};
use parking_lot::Mutex;

struct StaticCatalog {
    result: CatalogSearch,
    calls: Mutex<Vec<String>>,
}

impl StaticCatalog {
    fn new(result: CatalogSearch) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl SectionSource for StaticCatalog {
    fn search_sections(&self, code: &str) -> CatalogSearch {
        self.calls.lock().push(code.to_string());
        self.result.clone()
    }
}

/// Catalog that must never be reached; semantic queries bypass it.
struct UnusedCatalog;

impl SectionSource for UnusedCatalog {
    fn search_sections(&self, code: &str) -> CatalogSearch {
        panic!("catalog consulted for {code:?}");
    }
}

struct StaticEmbedder {
    vector: Option<Vec<f32>>,
}

impl QueryEmbedder for StaticEmbedder {
    fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        self.vector
            .clone()
            .ok_or_else(|| anyhow!("embedding provider offline"))
    }
}

/// Embedder that must never be reached; code queries bypass it.
struct UnusedEmbedder;

impl QueryEmbedder for UnusedEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        panic!("embedder consulted for {text:?}");
    }
}

enum IndexBehavior {
    Hits(Vec<CourseHit>),
    Fail,
}

struct StaticIndex {
    behavior: IndexBehavior,
    seen: Mutex<Option<(f64, i32)>>,
}

impl StaticIndex {
    fn new(behavior: IndexBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(None),
        }
    }
}

impl CourseMatcher for StaticIndex {
    fn match_courses(
        &self,
        _embedding: &[f32],
        threshold: f64,
        limit: i32,
    ) -> Result<Vec<CourseHit>> {
        *self.seen.lock() = Some((threshold, limit));
        match &self.behavior {
            IndexBehavior::Hits(hits) => Ok(hits.clone()),
            IndexBehavior::Fail => Err(anyhow!("index offline")),
        }
    }
}

/// Index that must never be reached; code queries bypass it.
struct UnusedIndex;

impl CourseMatcher for UnusedIndex {
    fn match_courses(&self, _: &[f32], _: f64, _: i32) -> Result<Vec<CourseHit>> {
        panic!("index consulted for a code query");
    }
}

fn section(key: &str, title: &str) -> CatalogSection {
    CatalogSection {
        key: key.to_string(),
        crn: "99999".to_string(),
        code: "CSCI-UA 2".to_string(),
        title: title.to_string(),
        location: "251 Mercer St".to_string(),
        instructor: "A. Lecturer".to_string(),
        schedule: "MW 11:00-12:15".to_string(),
        ..CatalogSection::default()
    }
}

fn hit(id: i64, similarity: f64) -> CourseHit {
    CourseHit {
        id,
        course_code: format!("CSCI-UA {id}"),
        title: "Distributed Systems".to_string(),
        description: "Consensus and replication.".to_string(),
        similarity,
    }
}

#[test]
fn course_code_query_is_answered_by_the_catalog() {
    let catalog = Arc::new(StaticCatalog::new(CatalogSearch {
        sections: vec![
            section("k1", "Intro A"),
            section("k2", "Intro B"),
            section("k3", "Intro C"),
        ],
        term_name: Some("Fall 2025".to_string()),
        message: None,
    }));
    let service = SearchService::new(
        catalog.clone(),
        Arc::new(UnusedEmbedder),
        Arc::new(UnusedIndex),
        SearchControls::default(),
    );

    let courses = service.search("CSCI-UA 0002").expect("search");
    assert_eq!(courses.len(), 3);
    for course in &courses {
        assert_relative_eq!(course.similarity, 1.0);
    }
    assert_eq!(*catalog.calls.lock(), ["CSCI-UA 0002"]);
}

#[test]
fn bare_department_codes_still_reach_the_catalog() {
    let catalog = Arc::new(StaticCatalog::new(CatalogSearch::default()));
    let service = SearchService::new(
        catalog.clone(),
        Arc::new(UnusedEmbedder),
        Arc::new(UnusedIndex),
        SearchControls::default(),
    );

    service.search("CSCI-UA").expect("search");
    assert_eq!(*catalog.calls.lock(), ["CSCI-UA"]);
}

#[test]
fn semantic_query_flows_through_embedding_and_index() {
    let index = Arc::new(StaticIndex::new(IndexBehavior::Hits(vec![
        hit(480, 0.81),
        hit(202, 0.55),
    ])));
    let service = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder {
            vector: Some(vec![0.1, 0.2, 0.3]),
        }),
        index.clone(),
        SearchControls::default(),
    );

    let courses = service.search("distributed systems").expect("search");
    assert_eq!(courses.len(), 2);
    assert_relative_eq!(courses[0].similarity, 0.81);
    assert_relative_eq!(courses[1].similarity, 0.55);
    assert_eq!(courses[0].id, "480");

    // Defaults travel to the backend rather than being re-hardcoded there.
    let seen = (*index.seen.lock()).expect("index consulted");
    assert_relative_eq!(seen.0, 0.3);
    assert_eq!(seen.1, 20);
}

#[test]
fn custom_controls_reach_the_index() {
    let index = Arc::new(StaticIndex::new(IndexBehavior::Hits(Vec::new())));
    let service = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder {
            vector: Some(vec![0.5; 8]),
        }),
        index.clone(),
        SearchControls::new(0.5, 5),
    );

    service.search("operating systems").expect("search");
    let seen = (*index.seen.lock()).expect("index consulted");
    assert_relative_eq!(seen.0, 0.5);
    assert_eq!(seen.1, 5);
}

#[test]
fn unknown_code_is_an_empty_success() {
    let catalog = Arc::new(StaticCatalog::new(CatalogSearch {
        sections: Vec::new(),
        term_name: None,
        message: Some(NO_COURSES_MESSAGE.to_string()),
    }));
    let service = SearchService::new(
        catalog,
        Arc::new(UnusedEmbedder),
        Arc::new(UnusedIndex),
        SearchControls::default(),
    );

    let courses = service.search("ZZZZ 9999").expect("search");
    assert!(courses.is_empty());
}

#[test]
fn no_semantic_matches_is_an_empty_success() {
    let service = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder {
            vector: Some(vec![0.0; 8]),
        }),
        Arc::new(StaticIndex::new(IndexBehavior::Hits(Vec::new()))),
        SearchControls::default(),
    );

    let courses = service.search("underwater basket weaving").expect("search");
    assert!(courses.is_empty());
}

#[test]
fn blank_queries_are_rejected() {
    let service = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(UnusedEmbedder),
        Arc::new(UnusedIndex),
        SearchControls::default(),
    );

    for query in ["", "   ", "\t\n"] {
        let err = service.search(query).expect_err("blank query");
        assert!(matches!(err, SearchError::EmptyQuery));
        assert_eq!(err.status(), 400);
        assert_eq!(err.public_message(), "Query parameter is required");
    }
}

#[test]
fn embedding_failure_is_an_embedding_error() {
    let service = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder { vector: None }),
        Arc::new(UnusedIndex),
        SearchControls::default(),
    );

    let err = service
        .search("machine learning")
        .expect_err("embedder offline");
    assert!(matches!(err, SearchError::Embedding(_)));
    assert_eq!(err.status(), 500);
    assert_eq!(err.public_message(), "Internal server error");
}

#[test]
fn index_failure_is_distinct_from_an_empty_result() {
    let failing = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder {
            vector: Some(vec![0.1; 8]),
        }),
        Arc::new(StaticIndex::new(IndexBehavior::Fail)),
        SearchControls::default(),
    );
    let err = failing.search("compilers").expect_err("index offline");
    assert!(matches!(err, SearchError::Index(_)));
    assert_eq!(err.status(), 500);

    let empty = SearchService::new(
        Arc::new(UnusedCatalog),
        Arc::new(StaticEmbedder {
            vector: Some(vec![0.1; 8]),
        }),
        Arc::new(StaticIndex::new(IndexBehavior::Hits(Vec::new()))),
        SearchControls::default(),
    );
    assert!(empty.search("compilers").expect("empty success").is_empty());
}
