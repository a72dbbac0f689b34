//! HTTP API server.
//!
//! Exposes the document index over a JSON HTTP API for the chat frontend.
//!
//! # Endpoints
//!
//! | Method   | Path                        | Description |
//! |----------|-----------------------------|-------------|
//! | `GET`    | `/health`                   | Health check (version, backend, document count) |
//! | `POST`   | `/login`                    | Mock login for the frontend |
//! | `POST`   | `/api/v1/data/upload`       | Multipart upload; unsupported/broken files are skipped |
//! | `GET`    | `/api/v1/data/sources`      | List uploaded documents |
//! | `DELETE` | `/api/v1/data/sources/{id}` | Delete a document (idempotent) |
//! | `POST`   | `/api/v1/chat`              | Ask a question; always 200, failures in-band |
//!
//! # Error Contract
//!
//! Transport-level errors use the JSON schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "expected multipart body" } }
//! ```
//!
//! The chat endpoint never uses it: retrieval and generation failures come
//! back as answer strings so the frontend renders them as messages.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for the browser frontend.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::chat;
use crate::config::Config;
use crate::ingest;
use crate::llm::{self, AnswerGenerator};
use crate::models::DocumentMeta;
use crate::registry::DocumentRegistry;
use crate::search::{self, SearchFacade};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<DocumentRegistry>,
    pub facade: Arc<SearchFacade>,
    pub generator: Arc<dyn AnswerGenerator>,
}

/// Build the application router. Public so integration tests can drive it
/// without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The body limit covers the whole multipart batch; the per-file limit is
    // enforced in the upload pipeline.
    let body_limit = state.config.upload.max_file_bytes.saturating_mul(4);

    Router::new()
        .route("/health", get(handle_health))
        .route("/login", post(handle_login))
        .route("/api/v1/data/upload", post(handle_upload))
        .route("/api/v1/data/sources", get(handle_sources))
        .route("/api/v1/data/sources/{id}", delete(handle_delete))
        .route("/api/v1/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server: resolve the content backend, restore the catalog from
/// disk, and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let facade = Arc::new(search::resolve(config).await?);
    let registry = Arc::new(ingest::restore_documents(config, &facade).await?);
    let generator: Arc<dyn AnswerGenerator> = Arc::from(llm::create_generator(&config.llm)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        registry,
        facade,
        generator,
    };

    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    info!(addr = %bind_addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

/// Internal error type that converts into an Axum HTTP response.
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    backend: String,
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.facade.backend_name().to_string(),
        documents: state.registry.len(),
    })
}

// ============ POST /login ============

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    #[allow(dead_code)]
    #[serde(default)]
    password: String,
}

/// Mock login kept for frontend compatibility; there are no accounts.
async fn handle_login(Json(request): Json<LoginRequest>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "token": "mock-token",
        "user": { "email": request.email }
    }))
}

// ============ POST /api/v1/data/upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    files: Vec<String>,
    skipped: Vec<SkippedFile>,
}

#[derive(Serialize)]
struct SkippedFile {
    name: String,
    reason: String,
}

/// Multipart upload. Each file is processed independently: a file that fails
/// validation, extraction, or indexing is reported in `skipped` without
/// failing the batch.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut uploaded = Vec::new();
    let mut skipped = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        let file_name = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                skipped.push(SkippedFile {
                    name: file_name,
                    reason: format!("failed to read upload: {}", e),
                });
                continue;
            }
        };

        match ingest::process_upload(
            &state.config,
            &state.registry,
            &state.facade,
            &file_name,
            &bytes,
        )
        .await
        {
            Ok(_) => uploaded.push(file_name),
            Err(e) => {
                warn!(file = %file_name, error = %e, "skipping upload");
                skipped.push(SkippedFile {
                    name: file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(Json(UploadResponse {
        message: format!("Successfully uploaded {} files", uploaded.len()),
        files: uploaded,
        skipped,
    }))
}

// ============ GET /api/v1/data/sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceEntry>,
}

/// Wire format the frontend expects: human-readable date and size strings.
#[derive(Serialize)]
struct SourceEntry {
    id: String,
    name: String,
    #[serde(rename = "type")]
    doc_type: String,
    status: String,
    #[serde(rename = "dateAdded")]
    date_added: String,
    size: String,
}

impl From<DocumentMeta> for SourceEntry {
    fn from(meta: DocumentMeta) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            doc_type: meta.doc_type,
            status: meta.status.to_string(),
            date_added: meta.uploaded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            size: format!("{:.1} KB", meta.size_bytes as f64 / 1024.0),
        }
    }
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let sources = state
        .registry
        .list()
        .into_iter()
        .map(SourceEntry::from)
        .collect();
    Json(SourcesResponse { sources })
}

// ============ DELETE /api/v1/data/sources/{id} ============

/// Idempotent delete: removing an unknown id still reports success.
async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ingest::delete_document(&state.config, &state.registry, &state.facade, &id)
        .await
        .map_err(|e| internal_error(e.to_string()))?;
    Ok(Json(
        serde_json::json!({ "message": "Source deleted successfully" }),
    ))
}

// ============ POST /api/v1/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

/// Always 200: every retrieval or generation failure maps to an in-band
/// answer string.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let answer = chat::answer_question(
        &state.registry,
        &state.facade,
        state.generator.as_ref(),
        &request.question,
    )
    .await;
    Json(ChatResponse { answer })
}
