//! Request orchestration: classify the query, dispatch to one backend,
//! normalize whatever comes back.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::catalog::{CatalogClient, CatalogSearch};
use crate::classifier::{classify, QueryKind};
use crate::controls::SearchControls;
use crate::embedder::NomicEmbedder;
use crate::index::{CourseHit, CourseIndex};
use crate::normalizer::{from_catalog, from_vector, CourseResult};

/// Catalog lookups keyed by course code.
pub trait SectionSource: Send + Sync {
    /// Searches the catalog across the term table. Infallible by contract:
    /// per-term failures collapse into the empty fallback.
    fn search_sections(&self, code: &str) -> CatalogSearch;
}

/// Query-time text embedding.
pub trait QueryEmbedder: Send + Sync {
    /// Converts a query into a fixed-dimension vector.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Similarity lookups over the precomputed course index.
pub trait CourseMatcher: Send + Sync {
    /// Returns ranked hits at or above `threshold`, capped at `limit`.
    fn match_courses(&self, embedding: &[f32], threshold: f64, limit: i32)
        -> Result<Vec<CourseHit>>;
}

impl SectionSource for CatalogClient {
    fn search_sections(&self, code: &str) -> CatalogSearch {
        self.search(code)
    }
}

impl QueryEmbedder for NomicEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        NomicEmbedder::embed_query(self, text)
    }
}

impl CourseMatcher for CourseIndex {
    fn match_courses(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: i32,
    ) -> Result<Vec<CourseHit>> {
        CourseIndex::match_courses(self, embedding, threshold, limit)
    }
}

/// Failures surfaced by the search pipeline.
#[derive(Debug)]
pub enum SearchError {
    /// The query was missing or blank after trimming.
    EmptyQuery,
    /// The embedding provider was unreachable or rejected the request.
    Embedding(anyhow::Error),
    /// The similarity index was unreachable or the query failed.
    Index(anyhow::Error),
}

impl SearchError {
    /// HTTP status the error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::EmptyQuery => 400,
            Self::Embedding(_) | Self::Index(_) => 500,
        }
    }

    /// Message safe to serialize to callers.
    ///
    /// Backend failures collapse to one generic message; the detailed cause
    /// goes to the server log only.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "Query parameter is required",
            Self::Embedding(_) | Self::Index(_) => "Internal server error",
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "query is missing or blank"),
            Self::Embedding(err) => write!(f, "embedding provider failure: {err:#}"),
            Self::Index(err) => write!(f, "course index failure: {err:#}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// The hybrid search pipeline.
///
/// Holds no per-request state: each call classifies the query, dispatches to
/// exactly one backend, and normalizes the result.
pub struct SearchService {
    catalog: Arc<dyn SectionSource>,
    embedder: Arc<dyn QueryEmbedder>,
    index: Arc<dyn CourseMatcher>,
    controls: SearchControls,
}

impl SearchService {
    /// Assembles the pipeline from its collaborators.
    pub fn new(
        catalog: Arc<dyn SectionSource>,
        embedder: Arc<dyn QueryEmbedder>,
        index: Arc<dyn CourseMatcher>,
        controls: SearchControls,
    ) -> Self {
        Self {
            catalog,
            embedder,
            index,
            controls,
        }
    }

    /// Runs one search request to completion.
    ///
    /// An empty result set is a success; only a blank query or a backend
    /// failure is an error.
    pub fn search(&self, query: &str) -> Result<Vec<CourseResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        match classify(query) {
            QueryKind::CourseCode => Ok(self.code_lookup(query)),
            QueryKind::Semantic => self.semantic_lookup(query),
        }
    }

    fn code_lookup(&self, code: &str) -> Vec<CourseResult> {
        let found = self.catalog.search_sections(code);
        match &found.term_name {
            Some(term) => tracing::debug!(
                code,
                term = %term,
                sections = found.sections.len(),
                "catalog lookup matched"
            ),
            None => tracing::debug!(code, "catalog lookup found nothing"),
        }
        from_catalog(&found.sections)
    }

    fn semantic_lookup(&self, query: &str) -> Result<Vec<CourseResult>, SearchError> {
        let embedding = self
            .embedder
            .embed_query(query)
            .map_err(SearchError::Embedding)?;
        let hits = self
            .index
            .match_courses(
                &embedding,
                self.controls.match_threshold(),
                self.controls.match_count(),
            )
            .map_err(SearchError::Index)?;
        tracing::debug!(hits = hits.len(), "vector lookup completed");
        Ok(from_vector(&hits))
    }
}
