//! Live catalog lookups with descending-recency term probing.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::terms::{TermDescriptor, TERM_TABLE};

/// Fallback notice attached when every term comes up empty.
pub const NO_COURSES_MESSAGE: &str = "No courses found.";

/// One course section extracted from a raw catalog payload.
///
/// The raw records are loosely structured; extraction is by presence checks
/// and fields the payload lacks are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSection {
    /// Stable section key, when present.
    pub key: String,
    /// Registration number, the fallback identifier.
    pub crn: String,
    /// Catalog course code, e.g. "CSCI-UA 2".
    pub code: String,
    /// Course title.
    pub title: String,
    /// Course description.
    pub description: String,
    /// Meeting location.
    pub location: String,
    /// Instructor name(s).
    pub instructor: String,
    /// Meeting pattern, e.g. "MW 11:00-12:15".
    pub schedule: String,
}

/// Outcome of a catalog search across the term table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSearch {
    /// Sections from the first term with any matches.
    pub sections: Vec<CatalogSection>,
    /// Human name of the matched term; absent on the empty fallback.
    pub term_name: Option<String>,
    /// Fallback notice when every term came up empty.
    pub message: Option<String>,
}

/// One term's worth of matches: the count the API reported plus the extracted
/// section payloads.
#[derive(Debug, Clone, Default)]
pub struct TermSections {
    /// Result count reported by the API.
    pub count: usize,
    /// Sections extracted from the response body.
    pub sections: Vec<CatalogSection>,
}

#[derive(Serialize)]
struct SearchPayload<'a> {
    other: TermScope<'a>,
    criteria: [Criterion<'a>; 1],
}

#[derive(Serialize)]
struct TermScope<'a> {
    srcdb: &'a str,
}

#[derive(Serialize)]
struct Criterion<'a> {
    field: &'a str,
    value: &'a str,
}

/// Blocking client for the class-search catalog API.
pub struct CatalogClient {
    client: Client,
    endpoint: String,
}

impl CatalogClient {
    /// Builds a catalog client against the given API base URL.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "missing catalog base URL");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build catalog HTTP client")?;
        let endpoint = format!(
            "{}/?page=fose&route=search",
            base_url.trim_end_matches('/')
        );
        Ok(Self { client, endpoint })
    }

    /// Searches the catalog for a course code, newest term first.
    ///
    /// A per-term failure counts as zero results for that term; the probe
    /// never aborts early on an error.
    pub fn search(&self, code: &str) -> CatalogSearch {
        probe_terms(TERM_TABLE, |term| self.fetch_term(code, term))
    }

    fn fetch_term(&self, code: &str, term: &TermDescriptor) -> Result<TermSections> {
        let payload = SearchPayload {
            other: TermScope { srcdb: term.code },
            criteria: [Criterion {
                field: "keyword",
                value: code,
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .with_context(|| format!("catalog request failed for term {}", term.code))?;
        let status = resp.status();
        anyhow::ensure!(
            status.is_success(),
            "catalog returned {} for term {}",
            status,
            term.code
        );
        let body: Value = resp
            .json()
            .with_context(|| format!("unparseable catalog body for term {}", term.code))?;
        parse_term_sections(&body)
    }
}

/// Probes terms in order, returning the first term with any matches.
///
/// Fetch failures are indistinguishable from empty terms: the loop records
/// them at debug level and moves on. When every term is empty the fallback
/// carries [`NO_COURSES_MESSAGE`] and no term name.
pub fn probe_terms<F>(terms: &[TermDescriptor], mut fetch: F) -> CatalogSearch
where
    F: FnMut(&TermDescriptor) -> Result<TermSections>,
{
    for term in terms {
        match fetch(term) {
            Ok(found) if found.count > 0 => {
                tracing::debug!(term = term.code, count = found.count, "catalog term matched");
                return CatalogSearch {
                    sections: found.sections,
                    term_name: Some(term.name.to_string()),
                    message: None,
                };
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(term = term.code, error = %err, "catalog term probe failed");
            }
        }
    }
    CatalogSearch {
        sections: Vec::new(),
        term_name: None,
        message: Some(NO_COURSES_MESSAGE.to_string()),
    }
}

/// Parses one term's search response, honoring the in-band `fatal` signal.
///
/// The API reports some failures as a `fatal` field inside an otherwise
/// successful response; those are errors here so the probe treats them like
/// any other failed term.
pub fn parse_term_sections(body: &Value) -> Result<TermSections> {
    let fatal = body.get("fatal").filter(|value| match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    });
    if let Some(fatal) = fatal {
        anyhow::bail!("catalog reported fatal condition: {fatal}");
    }
    let count = body.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;
    let sections = body
        .get("results")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(section_from_value).collect())
        .unwrap_or_default();
    Ok(TermSections { count, sections })
}

fn section_from_value(raw: &Value) -> CatalogSection {
    CatalogSection {
        key: text_field(raw, "key"),
        crn: text_field(raw, "crn"),
        code: text_field(raw, "code"),
        title: text_field(raw, "title"),
        description: text_field(raw, "description"),
        location: text_field(raw, "location"),
        instructor: text_field(raw, "instr"),
        schedule: text_field(raw, "meets"),
    }
}

/// Reads a string-ish field, accepting numeric scalars since the catalog is
/// inconsistent about identifier types.
fn text_field(raw: &Value, field: &str) -> String {
    match raw.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}
