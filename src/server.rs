//! JSON HTTP front end for the question answering pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question from the indexed documents |
//! | `GET`  | `/health` | Health check (returns version, no dependency checks) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `timeout` (408), `internal` (500).
//! Store and generation failures surface as `internal` with the underlying
//! message; there is no retry at this layer.
//!
//! # State
//!
//! The store client and generation backend are built once at startup into
//! [`AppState`] and shared by every request. Generation calls pass through
//! a semaphore sized by `generation.max_concurrent`, so concurrent requests
//! queue for the shared backend instead of piling onto it.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

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
use tracing::{debug, info};

use crate::config::Config;
use crate::generate::{create_generator, AdmissionControlled, Generator};
use crate::models::SourceRef;
use crate::pipeline;
use crate::store::{ChromaStore, VectorStore};

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor. Handles are process-lifetime: nothing here is re-initialized
/// per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn Generator>,
}

impl AppState {
    /// Build the real store client and generation backend from
    /// configuration, with bounded admission around generation.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = ChromaStore::new(&config.store, &config.embedding)?;
        let generator = AdmissionControlled::new(
            create_generator(&config.generation)?,
            config.generation.max_concurrent,
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            store: Arc::new(store),
            generator: Arc::new(generator),
        })
    }
}

/// Assemble the router. Separated from [`run_server`] so tests can drive
/// the routes in-process with substitute store and generator handles.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `[server].bind` and serve until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::from_config(config)?;
    let app = build_router(state);

    info!("askdocs server listening on http://{}", bind_addr);
    println!("askdocs server listening on http://{}", bind_addr);

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
    /// Machine-readable error code (e.g. `"bad_request"`).
    code: String,
    /// Human-readable error message.
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn timeout_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::REQUEST_TIMEOUT,
        code: "timeout".to_string(),
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

/// Map pipeline failures to HTTP status codes by message inspection, so the
/// pipeline stays free of HTTP concerns.
fn classify_pipeline_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("must not be empty") || msg.contains("invalid") {
        bad_request(msg)
    } else if msg.contains("timed out") || msg.contains("timeout") {
        timeout_error(msg)
    } else {
        internal_error(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// No dependency checks: a healthy process answers even when the store or
/// generation backend is down.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceRef>,
    /// Pipeline latency in seconds.
    latency: f64,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    debug!("answering question ({} chars)", request.question.len());

    let result = pipeline::run(
        state.store.as_ref(),
        state.generator.as_ref(),
        &state.config.retrieval,
        &request.question,
        None,
    )
    .await
    .map_err(classify_pipeline_error)?;

    Ok(Json(AskResponse {
        answer: result.answer,
        sources: result.sources,
        latency: result.latency_seconds,
    }))
}
