//! HTTP server for the upload and question-answering surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Upload page |
//! | `POST` | `/upload` | Multipart PDF upload (field name `file`) |
//! | `GET`  | `/qa` | Question-answering page |
//! | `POST` | `/ask` | JSON `{question}` against the active document |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! Every error body is `{"error": "<message>"}`. Validation and state
//! errors (missing file, empty filename, missing question, no active
//! document) are 400; extraction and provider failures are 500. A
//! provider outage is reported as an error payload, never rewritten into
//! an answer.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::answer::{ChatModel, SourceRef};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::session::Session;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Session,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
}

impl AppState {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            config: Arc::new(config),
            session: Session::new(),
            embedder,
            chat,
        }
    }
}

/// Build the application router. Exposed separately from [`run_server`]
/// so tests can drive it without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/upload", post(handle_upload))
        .route("/qa", get(handle_qa_page))
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();

    std::fs::create_dir_all(&state.config.uploads.dir)?;

    let app = router(state);
    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body: `{"error": "<message>"}`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_error() {
            AppError::bad_request(err.to_string())
        } else {
            AppError::internal(err.to_string())
        }
    }
}

// ============ Pages ============

async fn handle_index() -> Html<&'static str> {
    Html(include_str!("../assets/upload.html"))
}

async fn handle_qa_page() -> Html<&'static str> {
    Html(include_str!("../assets/qa.html"))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    redirect: String,
}

/// Handler for `POST /upload`.
///
/// Reads the `file` field from the multipart body, persists the bytes
/// under the uploads directory keyed by original filename, and runs the
/// indexing pipeline. The new pipeline replaces the previous one only on
/// full success.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::bad_request("No file part"));
    };
    if filename.is_empty() {
        return Err(AppError::bad_request("No selected file"));
    }

    // Persist the upload, overwriting any previous file with this name.
    let path = state.config.uploads.dir.join(&filename);
    tokio::fs::create_dir_all(&state.config.uploads.dir)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;

    let segments = state
        .session
        .ingest(&state.config, state.embedder.as_ref(), &filename, &bytes)
        .await
        .map_err(|e| {
            error!(document = %filename, "upload processing failed: {}", e);
            AppError::internal(e.to_string())
        })?;

    info!(document = %filename, segments, "upload processed");

    Ok(Json(UploadResponse {
        message: "File uploaded and processed successfully".to_string(),
        redirect: "/qa".to_string(),
    }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceRef>,
}

/// Handler for `POST /ask`.
///
/// State is checked before the question: asking with no active document
/// is reported even when the question is also missing.
async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if !state.session.is_ready().await {
        return Err(AppError::bad_request("No document has been uploaded yet"));
    }

    let question = match request.question {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(AppError::bad_request("No question provided")),
    };

    let answer = state
        .session
        .ask(state.embedder.as_ref(), state.chat.as_ref(), &question)
        .await
        .map_err(|e| {
            error!("question failed: {}", e);
            AppError::from(e)
        })?;

    Ok(Json(AskResponse {
        answer: answer.answer,
        sources: answer.sources,
    }))
}
