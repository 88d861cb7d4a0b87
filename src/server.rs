//! The story backend HTTP server.
//!
//! Serves the three contracts the chat front end consumes, plus a health
//! check:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Generate a story answer for a question |
//! | `POST` | `/generate-image` | Generate an illustration for a prompt |
//! | `GET`  | `/api/pdf-index` | The embedding index (embeddings + texts) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses carry a machine-readable code and a message:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `vendor_error` (502).
//!
//! Vendor failure on `/chat` is not an error: the canned fallback answer is
//! returned with 200 so a client's hard-failure path only ever fires on
//! transport or validation problems.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the canonical client
//! is a browser page served from another origin.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::retriever::StoryIndex;
use crate::story;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    /// The loaded index; `None` until `storybot index` has been run.
    index: Arc<Option<StoryIndex>>,
}

/// Start the story backend.
///
/// Binds to `[server].bind` and serves until the process is terminated.
/// `index` is whatever was loaded at startup; requests for `/api/pdf-index`
/// 404 when it is absent.
pub async fn run_server(config: &Config, index: Option<StoryIndex>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        config: Arc::new(config.clone()),
        index: Arc::new(index),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    // Report the resolved address (bind may have been to port 0) and
    // flush so supervisors reading a pipe see it immediately.
    println!("Story backend listening on http://{}", listener.local_addr()?);
    std::io::Write::flush(&mut std::io::stdout())?;

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handle_chat))
        .route("/generate-image", post(handle_generate_image))
        .route("/api/pdf-index", get(handle_pdf_index))
        .route("/health", get(handle_health))
        .with_state(state)
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

/// Internal error type that converts into an HTTP response.
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn vendor_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "vendor_error".to_string(),
        message: message.into(),
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

/// Handler for `POST /chat`.
///
/// Empty questions are rejected with 400. Vendor failure degrades to the
/// fallback answer rather than an error status.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = story::generate_story(&state.config.story, &req.question).await;
    Ok(Json(ChatResponse { answer }))
}

// ============ POST /generate-image ============

#[derive(Deserialize)]
struct ImageRequest {
    prompt: String,
}

#[derive(Serialize)]
struct ImageResponse {
    image_base64: String,
}

/// Handler for `POST /generate-image`.
///
/// Vendor failure maps to 502 `vendor_error`; clients treat any non-2xx as
/// "no illustration", so the degradation stays soft end to end.
async fn handle_generate_image(
    State(state): State<AppState>,
    Json(req): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }

    let image_base64 = story::generate_image(&state.config.image, &req.prompt)
        .await
        .map_err(|e| vendor_error(format!("{:#}", e)))?;

    Ok(Json(ImageResponse { image_base64 }))
}

// ============ GET /api/pdf-index ============

/// Handler for `GET /api/pdf-index`.
///
/// Returns the loaded index verbatim. 404 until `storybot index` has been
/// run and the server restarted with the index file present.
async fn handle_pdf_index(State(state): State<AppState>) -> Result<Json<StoryIndex>, AppError> {
    match state.index.as_ref() {
        Some(index) => Ok(Json(index.clone())),
        None => Err(not_found(
            "no index has been built; run `storybot index` first",
        )),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
