use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use coursefind::{
    CatalogClient, CourseIndex, CourseResult, HistoryStore, MatchFunction, NomicEmbedder,
    SearchControls, SearchError, SearchService,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "coursed",
    about = "HTTP API for hybrid course discovery: catalog code lookups plus pgvector semantic search"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "COURSEFIND_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Postgres connection string for the course index and history tables.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// SQL function performing the similarity match.
    #[arg(long, env = "COURSEFIND_MATCH_FUNCTION", default_value = "match_courses")]
    match_function: String,

    /// Table receiving search-history rows.
    #[arg(long, env = "COURSEFIND_HISTORY_TABLE", default_value = "search_history")]
    history_table: String,

    /// Minimum similarity for a vector match to be returned.
    #[arg(long, env = "COURSEFIND_MATCH_THRESHOLD", default_value_t = 0.3)]
    match_threshold: f64,

    /// Maximum vector matches returned per query.
    #[arg(long, env = "COURSEFIND_MATCH_COUNT", default_value_t = 20)]
    match_count: i32,

    /// Seconds before an index statement is cancelled.
    #[arg(long, env = "COURSEFIND_DB_TIMEOUT_SECS", default_value_t = 10)]
    db_timeout_secs: u64,

    /// Nomic API key used for query embeddings.
    #[arg(long, env = "NOMIC_API_KEY")]
    nomic_api_key: String,

    /// Embedding model identifier.
    #[arg(
        long,
        env = "COURSEFIND_NOMIC_MODEL",
        default_value = "nomic-embed-text-v1.5"
    )]
    nomic_model: String,

    /// Base URL for the Nomic Atlas API.
    #[arg(
        long,
        env = "COURSEFIND_NOMIC_BASE",
        default_value = "https://api-atlas.nomic.ai/v1"
    )]
    nomic_base_url: String,

    /// Embedding dimensionality; must match the index when set.
    #[arg(long, env = "COURSEFIND_NOMIC_DIMENSIONS")]
    nomic_dimensions: Option<usize>,

    /// Seconds before embedding requests time out.
    #[arg(long, env = "COURSEFIND_NOMIC_TIMEOUT_SECS", default_value_t = 15)]
    nomic_timeout_secs: u64,

    /// Retry attempts for transient embedding errors.
    #[arg(long, env = "COURSEFIND_NOMIC_MAX_RETRIES", default_value_t = 3)]
    nomic_max_retries: usize,

    /// Base URL of the class-search catalog API.
    #[arg(
        long,
        env = "COURSEFIND_CATALOG_BASE",
        default_value = "https://bulletins.nyu.edu/class-search/api"
    )]
    catalog_base_url: String,

    /// Seconds before each per-term catalog request times out.
    #[arg(long, env = "COURSEFIND_CATALOG_TIMEOUT_SECS", default_value_t = 10)]
    catalog_timeout_secs: u64,

    /// Max requests per minute allowed (0 disables rate limiting).
    #[arg(long, default_value_t = 120)]
    max_requests_per_minute: u32,

    /// Rate-limit burst size (tokens available instantly).
    #[arg(long, default_value_t = 12)]
    rate_limit_burst: u32,
}

#[derive(Clone)]
struct AppState {
    service: Arc<SearchService>,
    history: Arc<HistoryStore>,
    limiter: Option<RateLimiter>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    courses: Vec<CourseResult>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = ApiCli::parse();
    let function = MatchFunction::new(cli.match_function)?;
    let embedder = Arc::new(NomicEmbedder::new(
        cli.nomic_api_key,
        cli.nomic_base_url,
        cli.nomic_model,
        cli.nomic_dimensions,
        Duration::from_secs(cli.nomic_timeout_secs.max(1)),
        cli.nomic_max_retries.max(1),
    )?);
    let catalog = Arc::new(CatalogClient::new(
        cli.catalog_base_url,
        Duration::from_secs(cli.catalog_timeout_secs.max(1)),
    )?);
    let index = Arc::new(CourseIndex::connect(
        &cli.database_url,
        function,
        Duration::from_secs(cli.db_timeout_secs.max(1)),
    )?);
    let history = Arc::new(HistoryStore::connect(&cli.database_url, &cli.history_table)?);
    let controls = SearchControls::new(cli.match_threshold, cli.match_count);
    let service = Arc::new(SearchService::new(catalog, embedder, index, controls));

    let state = AppState {
        service,
        history,
        limiter: RateLimiter::new(cli.max_requests_per_minute, cli.rate_limit_burst),
    };
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/search", get(search_handler))
        .with_state(state);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    tracing::info!(%addr, "coursed listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    let query = params.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(error_response(&SearchError::EmptyQuery));
    }
    if let Some(limiter) = &state.limiter {
        if !limiter.acquire() {
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody {
                    error: "Too many requests".to_string(),
                }),
            ));
        }
    }

    // Best-effort history write, detached from the response path.
    if let Some(user) = caller_identity(&headers) {
        let history = state.history.clone();
        let logged = query.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = history.record(user, &logged) {
                tracing::warn!(%user, error = %err, "search history write failed");
            }
        });
    }

    let service = state.service.clone();
    let lookup = query.clone();
    let outcome = tokio::task::spawn_blocking(move || service.search(&lookup))
        .await
        .map_err(|err| {
            tracing::error!(query = %query, error = %err, "search task died");
            internal_error()
        })?;
    match outcome {
        Ok(courses) => {
            tracing::info!(query = %query, courses = courses.len(), "search completed");
            Ok(Json(SearchResponse { courses }))
        }
        Err(err) => {
            tracing::error!(query = %query, error = %err, "search failed");
            Err(error_response(&err))
        }
    }
}

/// Identity asserted by the upstream auth layer; absent or malformed means
/// anonymous.
fn caller_identity(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

fn error_response(err: &SearchError) -> (StatusCode, Json<ErrorBody>) {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorBody {
            error: err.public_message().to_string(),
        }),
    )
}

fn internal_error() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "Internal server error".to_string(),
        }),
    )
}

#[derive(Clone)]
struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    capacity: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    fn new(max_per_minute: u32, burst: u32) -> Option<Self> {
        if max_per_minute == 0 || burst == 0 {
            return None;
        }
        Some(Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: f64::from(burst),
                refilled_at: Instant::now(),
            })),
            capacity: f64::from(burst),
            refill_per_sec: f64::from(max_per_minute) / 60.0,
        })
    }

    fn acquire(&self) -> bool {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.refilled_at = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }
}
