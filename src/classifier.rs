//! Query-shape classification for hybrid search routing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Routing decision derived from the raw query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Structured catalog identifier such as "CSCI-UA 0002"; answered by the
    /// live catalog.
    CourseCode,
    /// Free-text topic query; answered by the vector index.
    Semantic,
}

/// The two course-code shapes: a hyphenated subject/department pair with an
/// optional section number ("CS-UY 1114", "CSCI-UA"), or a bare subject
/// followed by 2-4 digits ("MATH 101"). The digit group is optional only in
/// the hyphenated shape; that asymmetry decides which backend borderline
/// queries reach and must not be "simplified" away.
static COURSE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Za-z]{2,}-\w{2,}\s*\d{0,4}$|^[A-Za-z]{2,}\s*\d{2,4}$")
        .expect("course code pattern")
});

/// Classifies a query as a course-code lookup or a semantic search.
///
/// Pure and total: surrounding whitespace is ignored, case is ignored, and
/// anything that does not look like a catalog code is free text.
pub fn classify(query: &str) -> QueryKind {
    if COURSE_CODE.is_match(query.trim()) {
        QueryKind::CourseCode
    } else {
        QueryKind::Semantic
    }
}
