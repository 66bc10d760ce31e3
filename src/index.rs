//! Postgres/pgvector access to the precomputed course index.

use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use pgvector::Vector;
use postgres::{Client, NoTls, Row};

/// Validated name of the SQL function performing the similarity match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFunction(String);

impl MatchFunction {
    /// Validates and wraps a function name.
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        anyhow::ensure!(!name.trim().is_empty(), "match function name is required");
        anyhow::ensure!(
            name.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
            "match function name may only contain alphanumerics and underscores, got {name:?}"
        );
        Ok(Self(name))
    }

    /// Quoted identifier safe to splice into SQL.
    pub fn qualified(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

/// One ranked row returned by the similarity function.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseHit {
    /// Index row identifier.
    pub id: i64,
    /// Catalog course code stored alongside the embedding.
    pub course_code: String,
    /// Course title.
    pub title: String,
    /// Course description.
    pub description: String,
    /// Backend-reported similarity in `[0, 1]`.
    pub similarity: f64,
}

/// Blocking client for the course similarity index.
///
/// The connection is used only from blocking threads; a mutex serializes
/// access since the underlying client is not shareable.
pub struct CourseIndex {
    client: Mutex<Client>,
    query_sql: String,
}

impl CourseIndex {
    /// Connects to Postgres and caps per-statement runtime so a wedged index
    /// cannot hang a request indefinitely.
    pub fn connect(
        database_url: &str,
        function: MatchFunction,
        statement_timeout: Duration,
    ) -> Result<Self> {
        let mut client = Client::connect(database_url, NoTls)
            .context("failed to connect to the course index database")?;
        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                statement_timeout.as_millis()
            ))
            .context("failed to set index statement timeout")?;
        Ok(Self {
            client: Mutex::new(client),
            query_sql: select_sql(&function),
        })
    }

    /// Runs the similarity function against a query embedding.
    ///
    /// Rows arrive ranked descending by similarity, already thresholded and
    /// capped by the function itself. An error here means the index is
    /// unavailable and must not be mistaken for an empty result.
    pub fn match_courses(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: i32,
    ) -> Result<Vec<CourseHit>> {
        let vector = Vector::from(embedding.to_vec());
        let mut client = self.client.lock();
        let rows = client
            .query(self.query_sql.as_str(), &[&vector, &threshold, &limit])
            .context("course similarity query failed")?;
        rows.iter().map(hit_from_row).collect()
    }
}

fn hit_from_row(row: &Row) -> Result<CourseHit> {
    Ok(CourseHit {
        id: row.try_get("id").context("course row missing id")?,
        course_code: text_column(row, "course_code")?,
        title: text_column(row, "title")?,
        description: text_column(row, "description")?,
        similarity: row
            .try_get("similarity")
            .context("course row missing similarity")?,
    })
}

fn text_column(row: &Row, column: &str) -> Result<String> {
    let value: Option<String> = row
        .try_get(column)
        .with_context(|| format!("course row missing {column}"))?;
    Ok(value.unwrap_or_default())
}

fn select_sql(function: &MatchFunction) -> String {
    format!(
        "SELECT id, course_code, title, description, similarity FROM {}($1, $2, $3)",
        function.qualified()
    )
}
