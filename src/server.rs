//! JSON HTTP server for uploads and questions.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/upload` | Replace the working set and rebuild the index |
//! | `POST` | `/api/query`  | Answer a question from the current index |
//! | `GET`  | `/health`     | Health check (version, index readiness) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_index", "message": "index has not been constructed yet." } }
//! ```
//!
//! Status codes follow [`PipelineError::code`]: `decode_failure` (400, also
//! for request bodies that are not the expected JSON),
//! `extraction_failure` (422), `no_index` (409), `index_build_failure` and
//! `query_failure` (502), `io_failure` and `configuration_failure` (500).

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{Answer, IngestReport, UploadFile};
use crate::service::DocumentQa;

/// Uploads arrive base64-encoded inside JSON.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Builds the service from `config` and serves on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(DocumentQa::from_config(config).await?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    serve(listener, service).await
}

/// Serves `service` on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    service: Arc<DocumentQa>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(service)).await?;
    Ok(())
}

pub fn router(service: Arc<DocumentQa>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
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

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Decode { .. } => StatusCode::BAD_REQUEST,
            PipelineError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::NoIndex => StatusCode::CONFLICT,
            PipelineError::IndexBuild(_) | PipelineError::Query(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Io { .. } | PipelineError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Bodies that are not the expected JSON shape are malformed uploads or
/// queries, reported like any other payload error.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "decode_failure".to_string(),
            message: rejection.body_text(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    index_ready: bool,
}

async fn handle_health(State(service): State<Arc<DocumentQa>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_ready: service.session().has_index().await,
    })
}

// ============ POST /api/upload ============

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFile>,
}

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    count: usize,
    #[serde(flatten)]
    report: IngestReport,
}

async fn handle_upload(
    State(service): State<Arc<DocumentQa>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(request) = payload?;
    let report = service.ingest(request.files).await?;
    Ok(Json(UploadResponse {
        status: "success".to_string(),
        count: report.documents,
        report,
    }))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    text: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn handle_query(
    State(service): State<Arc<DocumentQa>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload?;
    let response = match service.query(&request.text).await? {
        Answer::Text(answer) => QueryResponse {
            answer: Some(answer),
            message: None,
        },
        Answer::NoRelevantResult => QueryResponse {
            answer: None,
            message: Some(Answer::NO_RELEVANT_MESSAGE.to_string()),
        },
    };
    Ok(Json(response))
}
