//! Normalization of heterogeneous backend records into the unified schema.

use serde::Serialize;

use crate::catalog::CatalogSection;
use crate::index::CourseHit;

/// Similarity assigned to catalog hits: a code lookup is definitionally an
/// exact match, not a ranked estimate.
const EXACT_MATCH: f64 = 1.0;

/// Unified course listing returned to callers regardless of backend.
///
/// Every field is always present; sources that lack a field contribute an
/// empty string.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseResult {
    /// Stable identifier: the catalog section key (or crn), or the index row
    /// id rendered as a decimal string.
    pub id: String,
    /// Catalog course code.
    pub course_code: String,
    /// Course title.
    pub title: String,
    /// Course description.
    pub description: String,
    /// Match confidence: 1.0 for catalog hits, the backend score otherwise.
    pub similarity: f64,
    /// Meeting location.
    pub location: String,
    /// Instructor name(s).
    pub instructor: String,
    /// Meeting pattern.
    pub schedule: String,
}

/// Maps catalog sections into unified results.
pub fn from_catalog(sections: &[CatalogSection]) -> Vec<CourseResult> {
    sections
        .iter()
        .map(|section| CourseResult {
            id: if section.key.is_empty() {
                section.crn.clone()
            } else {
                section.key.clone()
            },
            course_code: section.code.clone(),
            title: section.title.clone(),
            description: section.description.clone(),
            similarity: EXACT_MATCH,
            location: section.location.clone(),
            instructor: section.instructor.clone(),
            schedule: section.schedule.clone(),
        })
        .collect()
}

/// Maps vector index hits into unified results.
///
/// The index schema does not surface location, instructor, or schedule, so
/// those fields stay empty for semantic matches.
pub fn from_vector(hits: &[CourseHit]) -> Vec<CourseResult> {
    hits.iter()
        .map(|hit| CourseResult {
            id: hit.id.to_string(),
            course_code: hit.course_code.clone(),
            title: hit.title.clone(),
            description: hit.description.clone(),
            similarity: hit.similarity,
            location: String::new(),
            instructor: String::new(),
            schedule: String::new(),
        })
        .collect()
}
