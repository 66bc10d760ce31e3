//! Nomic Atlas embedding client for query-time vectors.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Embedding purpose advertised to the provider.
///
/// The model encodes queries and documents asymmetrically: the course index
/// is built with [`EmbeddingTask::SearchDocument`] vectors and lookups must
/// use [`EmbeddingTask::SearchQuery`] or similarity scores degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingTask {
    /// Query-time encoding.
    SearchQuery,
    /// Index-time document encoding.
    SearchDocument,
}

/// Blocking embeddings client for the Nomic Atlas text endpoint.
#[derive(Clone)]
pub struct NomicEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensionality: Option<usize>,
    max_retries: usize,
}

impl NomicEmbedder {
    /// Builds a new embeddings client.
    ///
    /// Fails when the API key or model name is blank so a misconfigured
    /// deployment dies at startup rather than on the first query.
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensionality: Option<usize>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Nomic API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing Nomic model name");
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid Nomic API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Nomic HTTP client")?;
        let endpoint = format!("{}/embedding/text", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensionality,
            max_retries: max_retries.max(1),
        })
    }

    /// Embeds a batch of texts for the given task.
    ///
    /// Retries 429s, 5xxs, and transport errors with exponential backoff up
    /// to the configured attempt budget. When a dimensionality is configured
    /// it is both requested from the provider and enforced on the response,
    /// since a vector of the wrong width would silently break the index
    /// lookup downstream.
    pub fn embed(&self, texts: &[&str], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                task_type: task,
                texts,
                dimensionality: self.dimensionality,
            };
            let response = self.client.post(&self.endpoint).json(&request).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp
                            .json()
                            .context("failed to parse Nomic embedding response")?;
                        anyhow::ensure!(
                            parsed.embeddings.len() == texts.len(),
                            "Nomic returned {} embeddings for {} texts",
                            parsed.embeddings.len(),
                            texts.len()
                        );
                        if let Some(expected) = self.dimensionality {
                            for vector in &parsed.embeddings {
                                anyhow::ensure!(
                                    vector.len() == expected,
                                    "Nomic returned a {}-dimension vector, expected {}",
                                    vector.len(),
                                    expected
                                );
                            }
                        }
                        return Ok(parsed.embeddings);
                    }

                    let body = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    anyhow::bail!("Nomic embedding request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Embeds a single search query.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text], EmbeddingTask::SearchQuery)?;
        vectors
            .pop()
            .context("Nomic returned no embedding for the query")
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(300 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    task_type: EmbeddingTask,
    texts: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensionality: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}
