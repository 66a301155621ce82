//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Run a search-DSL request, results grouped by bucket |
//! | `POST` | `/events` | Process a change-event batch |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Successful responses are `{"message": "success", "data": ...}`. Errors
//! are `{"error": "<message>"}` with `400` for request-shape errors, `401`
//! for a missing or wrong bearer token, and `500` for backend failures.
//!
//! Each handler runs under the configured request deadline. When it
//! expires the handler future is dropped, which cancels any in-flight OCR
//! or store call.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query as UrlQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use tower_http::cors::{Any, CorsLayer};

use pagegrep_core::events::parse_batch;
use pagegrep_core::ocr::OcrEngine;
use pagegrep_core::store::DocumentStore;

use crate::config::Config;
use crate::db;
use crate::pipeline::{BatchReport, Pipeline, PipelineError};
use crate::search::{QueryService, SearchError, SearchResults};
use crate::sqlite_store::SqliteStore;
use crate::textract;

type HmacSha256 = Hmac<Sha256>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub search: QueryService,
    pub pipeline: Pipeline,
    pub shared_secret: Option<Arc<str>>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ocr: Arc<dyn OcrEngine>,
        shared_secret: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            search: QueryService::new(store.clone()),
            pipeline: Pipeline::new(ocr, store),
            shared_secret: shared_secret.map(Arc::from),
            request_timeout,
        }
    }
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", post(handle_search))
        .route("/events", post(handle_events))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));
    store.setup().await?;
    let ocr = textract::build_engine(&config.ocr)?;

    let state = AppState::new(
        store,
        ocr,
        config.server.shared_secret.clone(),
        config.server.request_timeout(),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, ocr = %config.ocr.provider, "pagegrep server listening");
    println!("pagegrep server listening on http://{}", config.server.bind);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Responses ============

#[derive(Serialize)]
struct Success<T: Serialize> {
    message: &'static str,
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        message: "success",
        data,
    })
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        message: "unauthorized".to_string(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Query(e) => bad_request(e.to_string()),
            SearchError::Store(e) => {
                tracing::error!(code = e.code(), context = e.context(), error = ?e, "search failed");
                internal(e.to_string())
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_error() {
            return bad_request(err.to_string());
        }
        tracing::error!(code = err.code(), error = ?err, "event batch failed");
        internal(err.to_string())
    }
}

// ============ Admission ============

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(secret) = state.shared_secret.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if secret_matches(secret, token) => Ok(()),
        _ => Err(unauthorized()),
    }
}

/// Constant-time token check: both values key an HMAC over the same
/// message and the tags are compared with `verify_slice`.
fn secret_matches(secret: &str, presented: &str) -> bool {
    const MESSAGE: &[u8] = b"pagegrep bearer token";
    let (Ok(mut expected), Ok(mut given)) = (
        HmacSha256::new_from_slice(secret.as_bytes()),
        HmacSha256::new_from_slice(presented.as_bytes()),
    ) else {
        return false;
    };
    expected.update(MESSAGE);
    given.update(MESSAGE);
    given.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

fn parse_json(body: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice(body).map_err(|e| bad_request(format!("invalid JSON body: {}", e)))
}

/// Run `fut` under the request deadline.
async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "request deadline exceeded");
            Err(internal("request deadline exceeded"))
        }
    }
}

// ============ POST /search ============

#[derive(Debug, Deserialize)]
struct SearchParams {
    /// Comma-separated bucket names.
    buckets: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<SearchParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Success<SearchResults>>, AppError> {
    authorize(&state, &headers)?;
    let value = parse_json(&body)?;
    // An empty `?buckets=` list means no restriction.
    let scope = params
        .buckets
        .map(|b| {
            b.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .filter(|buckets| !buckets.is_empty());

    let results = with_deadline(state.request_timeout, async {
        state.search.search(&value, scope).await.map_err(AppError::from)
    })
    .await?;
    Ok(success(results))
}

// ============ POST /events ============

async fn handle_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Success<BatchReport>>, AppError> {
    authorize(&state, &headers)?;
    let value = parse_json(&body)?;
    let events = parse_batch(&value).map_err(|e| bad_request(e.to_string()))?;

    let report = with_deadline(state.request_timeout, async {
        state.pipeline.process(&events).await.map_err(AppError::from)
    })
    .await?;
    Ok(success(report))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
