use std::path::PathBuf;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::convert::{Conversion, OUTPUT_FILENAME, convert_bytes, encode_document};
use crate::error::ConvertError;
use crate::gate::ConversionGate;
use crate::upload::ChunkStore;

/// Boundary configuration. The size ceiling and deadline live here, not in
/// the pipeline: the core is size-agnostic and only reports the byte
/// length it processed.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub max_concurrency: usize,
    pub deadline: Duration,
    pub max_input_bytes: usize,
    pub spool_dir: PathBuf,
}

#[derive(Clone)]
struct AppState {
    gate: ConversionGate,
    chunks: ChunkStore,
    max_input_bytes: usize,
}

/// Binds and serves the conversion API until the process is terminated.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.spool_dir)?;
    let bind = config.bind.clone();
    let app = build_router(&config);

    tracing::info!(
        bind = %bind,
        max_concurrency = config.max_concurrency,
        deadline_ms = config.deadline.as_millis() as u64,
        max_input_bytes = config.max_input_bytes,
        spool_dir = %config.spool_dir.display(),
        "serving conversion api"
    );

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(config: &ServerConfig) -> Router {
    let state = AppState {
        gate: ConversionGate::new(config.max_concurrency, config.deadline),
        chunks: ChunkStore::new(&config.spool_dir),
        max_input_bytes: config.max_input_bytes,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/convert", post(handle_convert))
        .route("/api/upload/start", post(handle_upload_start))
        .route("/api/upload/chunk", post(handle_upload_chunk))
        .route("/api/upload/finalize", post(handle_upload_finalize))
        .layer(DefaultBodyLimit::max(config.max_input_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error responses ============

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
    code: &'static str,
    message: String,
}

impl AppError {
    fn payload_too_large(bytes: usize, limit: usize) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            code: "payload_too_large",
            message: format!("input is {bytes} bytes, the ceiling is {limit}"),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
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

impl From<ConvertError> for AppError {
    fn from(error: ConvertError) -> Self {
        let status = match &error {
            ConvertError::MalformedInput { .. } | ConvertError::MissingChunks { .. } => {
                StatusCode::BAD_REQUEST
            }
            ConvertError::NoValidConversations => StatusCode::UNPROCESSABLE_ENTITY,
            ConvertError::ServerBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ConvertError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ConvertError::Io(_) | ConvertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: error.code(),
            message: error.to_string(),
        }
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    slots_available: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        slots_available: state.gate.available(),
    })
}

// ============ POST /api/convert ============

async fn handle_convert(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Response, AppError> {
    if body.len() > state.max_input_bytes {
        return Err(AppError::payload_too_large(body.len(), state.max_input_bytes));
    }

    let conversion = state
        .gate
        .run(move || {
            let conversion = convert_bytes(&body)?;
            if conversion.document.is_empty() {
                return Err(ConvertError::NoValidConversations);
            }
            Ok(conversion)
        })
        .await?;

    respond_with_document(&conversion)
}

// ============ POST /api/upload/start ============

#[derive(Deserialize)]
struct StartRequest {
    filename: String,
}

#[derive(Serialize)]
struct StartResponse {
    filename: String,
    status: String,
}

async fn handle_upload_start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    require_json_filename(&request.filename)?;
    state.chunks.start_session(&request.filename)?;
    tracing::info!(filename = %request.filename, "upload session started");
    Ok(Json(StartResponse {
        filename: request.filename,
        status: "created".to_string(),
    }))
}

// ============ POST /api/upload/chunk ============

#[derive(Deserialize)]
struct ChunkParams {
    filename: String,
    chunk_index: usize,
    total_chunks: usize,
}

#[derive(Serialize)]
struct ChunkResponse {
    filename: String,
    chunk_index: usize,
    last_chunk: bool,
}

async fn handle_upload_chunk(
    State(state): State<AppState>,
    Query(params): Query<ChunkParams>,
    body: axum::body::Bytes,
) -> Result<Json<ChunkResponse>, AppError> {
    let last_chunk = state.chunks.write_chunk(
        &params.filename,
        params.chunk_index,
        params.total_chunks,
        &body,
    )?;
    Ok(Json(ChunkResponse {
        filename: params.filename,
        chunk_index: params.chunk_index,
        last_chunk,
    }))
}

// ============ POST /api/upload/finalize ============

#[derive(Deserialize)]
struct FinalizeRequest {
    filename: String,
    total_chunks: usize,
}

async fn handle_upload_finalize(
    State(state): State<AppState>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Response, AppError> {
    require_json_filename(&request.filename)?;
    let assembled = state
        .chunks
        .reassemble(&request.filename, request.total_chunks)?;
    tracing::info!(
        filename = %request.filename,
        total_chunks = request.total_chunks,
        bytes = assembled.len(),
        "upload reassembled"
    );

    if assembled.len() > state.max_input_bytes {
        return Err(AppError::payload_too_large(assembled.len(), state.max_input_bytes));
    }

    let conversion = state
        .gate
        .run(move || {
            let conversion = convert_bytes(&assembled)?;
            if conversion.document.is_empty() {
                return Err(ConvertError::NoValidConversations);
            }
            Ok(conversion)
        })
        .await?;

    respond_with_document(&conversion)
}

fn require_json_filename(filename: &str) -> Result<(), AppError> {
    if filename.ends_with(".json") {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "invalid file type `{filename}`; upload a .json export"
        )))
    }
}

fn respond_with_document(conversion: &Conversion) -> Result<Response, AppError> {
    tracing::info!(
        threads = conversion.stats.threads_emitted,
        messages = conversion.stats.messages_emitted,
        elapsed_ms = conversion.stats.elapsed_ms,
        input_bytes = conversion.stats.input_bytes,
        warnings = conversion.stats.warnings,
        "conversion complete"
    );
    for warning in &conversion.warnings {
        tracing::debug!(warning = %warning, "conversion warning");
    }

    let body = encode_document(&conversion.document)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={OUTPUT_FILENAME}"),
            ),
        ],
        body,
    )
        .into_response())
}
