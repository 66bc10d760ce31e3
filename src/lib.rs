#![warn(missing_docs)]
//! Core library entry points for the coursefind hybrid search service.

pub mod catalog;
pub mod classifier;
pub mod controls;
pub mod embedder;
pub mod history;
pub mod index;
pub mod normalizer;
pub mod search;
pub mod terms;

pub use catalog::{CatalogClient, CatalogSearch, CatalogSection, TermSections, NO_COURSES_MESSAGE};
pub use classifier::{classify, QueryKind};
pub use controls::SearchControls;
pub use embedder::{EmbeddingTask, NomicEmbedder};
pub use history::HistoryStore;
pub use index::{CourseHit, CourseIndex, MatchFunction};
pub use normalizer::{from_catalog, from_vector, CourseResult};
pub use search::{CourseMatcher, QueryEmbedder, SearchError, SearchService, SectionSource};
pub use terms::{TermDescriptor, TERM_TABLE};
