//! HTTP server for ingestion, retrieval, and draft generation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/upload` | Ingest a zip archive sent as the raw request body |
//! | `GET`  | `/evidence?facet=` | Chunks with source locations, optionally by facet |
//! | `POST` | `/search` | Ranked chunks for `{query, facets?, top_k?}` |
//! | `POST` | `/draft` | Assembled sections and citations |
//! | `GET`  | `/export` | The draft as a Markdown report download |
//! | `POST` | `/ip_scout/search?query=&top_k=` | Ranked seed patents and a claim skeleton |
//!
//! # Error Contract
//!
//! All error responses share one shape:
//!
//! ```json
//! { "error": { "code": "archive_error", "message": "invalid Zip archive" } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | malformed request body |
//! | `archive_error` | 400 | unreadable archive or non-UTF-8 entry |
//! | `not_found` | 404 | unknown record |
//! | `config_error` | 500 | ontology or configuration failure |
//! | `integrity_error` | 500 | stored chunk offsets are inconsistent |
//! | `internal` | 500 | anything else |
//! | `store_unavailable` | 503 | the record store failed |
//!
//! An empty result list always means "nothing matched"; a failing store
//! is reported as `store_unavailable`, never as an empty list.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can call the API directly.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::draft::{assemble, Category, Draft, MarkdownSectionRenderer};
use crate::error::Error;
use crate::export::{render_report, REPORT_FILE_NAME};
use crate::ingest::{ingest_archive, IngestOptions, IngestReport};
use crate::ip_scout::{load_patents, scout, ScoutReport};
use crate::models::Citation;
use crate::ontology::Ontology;
use crate::retrieval::SearchRequest;
use crate::search::{search_chunks, SearchHit};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Build the router with all routes, CORS, and the upload size limit.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/evidence", get(handle_evidence))
        .route("/search", post(handle_search))
        .route("/draft", post(handle_draft))
        .route("/export", get(handle_export))
        .route("/ip_scout/search", post(handle_ip_scout))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Serve `state` on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Starts the HTTP server on `[server].bind` backed by the SQLite store.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(config.clone(), Arc::new(store));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");
    println!("SR&ED server listening on http://{}", bind_addr);

    serve(listener, state).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Archive(_) => (StatusCode::BAD_REQUEST, "archive_error"),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Error::Validation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "integrity_error"),
            Error::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            error!(code, error = %err, "request failed");
        }
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
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

// ============ POST /upload ============

/// Ingest the request body as a zip archive.
///
/// The ontology is re-read on every upload so edits to the YAML file take
/// effect without a restart. Re-uploading an archive after an edit re-tags
/// its documents.
async fn handle_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestReport>, AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain a zip archive"));
    }
    let ontology = Ontology::load(&state.config.ontology.path)?;
    let opts = IngestOptions::from_config(&state.config);
    let report = ingest_archive(state.store.as_ref(), &ontology, &body, &opts).await?;
    Ok(Json(report))
}

// ============ GET /evidence ============

#[derive(Deserialize)]
struct EvidenceParams {
    facet: Option<String>,
}

async fn handle_evidence(
    State(state): State<AppState>,
    Query(params): Query<EvidenceParams>,
) -> Result<Json<Vec<Citation>>, AppError> {
    let facet = params.facet.as_deref().filter(|f| !f.is_empty());
    Ok(Json(state.store.list_evidence(facet).await?))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchBody {
    query: String,
    #[serde(default)]
    facets: Option<Vec<String>>,
    #[serde(default)]
    top_k: Option<i64>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(body) = payload.map_err(|e| bad_request(e.body_text()))?;

    let req = SearchRequest {
        query: &body.query,
        facets: body.facets.as_deref(),
        top_k: body.top_k.unwrap_or(state.config.retrieval.top_k),
        max_candidates: state.config.retrieval.max_candidates,
    };
    let results = search_chunks(state.store.as_ref(), &req).await?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /draft, GET /export ============

async fn build_draft(state: &AppState) -> Result<Draft, AppError> {
    let categories: Vec<Category> = state
        .config
        .draft
        .categories
        .iter()
        .map(Category::from)
        .collect();
    let draft = assemble(
        state.store.as_ref(),
        &categories,
        state.config.draft.top_k,
        &MarkdownSectionRenderer,
        state.config.draft.dedup_citations,
    )
    .await?;
    Ok(draft)
}

async fn handle_draft(State(state): State<AppState>) -> Result<Json<Draft>, AppError> {
    Ok(Json(build_draft(&state).await?))
}

async fn handle_export(State(state): State<AppState>) -> Result<Response, AppError> {
    let draft = build_draft(&state).await?;
    let disposition = format!("attachment; filename=\"{}\"", REPORT_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        render_report(&draft),
    )
        .into_response())
}

// ============ POST /ip_scout/search ============

#[derive(Deserialize)]
struct IpScoutParams {
    query: String,
    #[serde(default)]
    top_k: Option<i64>,
}

/// The patent list is read per request, like the ontology on upload.
async fn handle_ip_scout(
    State(state): State<AppState>,
    params: Result<Query<IpScoutParams>, QueryRejection>,
) -> Result<Json<ScoutReport>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let patents = load_patents(&state.config.ip_scout.patents_path)?;
    let top_k = params.top_k.unwrap_or(state.config.ip_scout.top_k);
    Ok(Json(scout(&patents, &params.query, top_k)))
}
