//! HTTP API server.
//!
//! Exposes ingestion and question answering as a JSON API for the browser
//! extension that collects history.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/history/rebuild` | Drop and re-embed a user's history collection from a batch |
//! | `POST` | `/api/history/upsert` | Upsert a batch under stable record identifiers |
//! | `POST` | `/api/chat` | Answer a question over the user's history |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error contract
//!
//! Failures map onto a JSON body:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the collector runs as
//! a browser extension and calls this API cross-origin.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::ask;
use crate::config::Config;
use crate::distill;
use crate::ingest;
use crate::models::{AskResponse, HistoryBatch};
use crate::store::{sanitize_user_id, SqliteStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
}

/// Starts the HTTP server on the configured bind address.
///
/// Opens the store (running migrations, so a fresh deployment needs no
/// separate `init`) and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::connect(config).await?;
    store.migrate().await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/history/rebuild", post(handle_rebuild))
        .route("/api/history/upsert", post(handle_upsert))
        .route("/api/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
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

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors onto HTTP responses: validation misses are client
/// errors, everything else (provider, store) is a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("No items") || msg.contains("must not be empty") {
        bad_request(msg)
    } else {
        internal(msg)
    }
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

// ============ POST /api/history/rebuild ============

#[derive(Serialize)]
struct RebuildResponse {
    success: bool,
    total_items: usize,
    chunks_created: usize,
    message: String,
}

/// Drops the user's history collection and rebuilds it from the batch.
async fn handle_rebuild(
    State(state): State<AppState>,
    Json(batch): Json<HistoryBatch>,
) -> Result<Json<RebuildResponse>, AppError> {
    let summary = ingest::run_ingest(&state.config, state.store.as_ref(), &batch, true, false)
        .await
        .map_err(classify_error)?;

    Ok(Json(RebuildResponse {
        success: true,
        total_items: summary.items,
        chunks_created: summary.chunks_written,
        message: "ok".to_string(),
    }))
}

// ============ POST /api/history/upsert ============

#[derive(Serialize)]
struct UpsertResponse {
    ok: bool,
    upserted: usize,
}

/// Stable-identifier upsert: superseded records are replaced, not duplicated.
async fn handle_upsert(
    State(state): State<AppState>,
    Json(batch): Json<HistoryBatch>,
) -> Result<Json<UpsertResponse>, AppError> {
    if batch.items.is_empty() {
        return Ok(Json(UpsertResponse {
            ok: true,
            upserted: 0,
        }));
    }

    let summary = ingest::run_ingest(&state.config, state.store.as_ref(), &batch, false, false)
        .await
        .map_err(classify_error)?;

    Ok(Json(UpsertResponse {
        ok: true,
        upserted: summary.items,
    }))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Answers a question, then hands the exchange to the memory distiller
/// fire-and-forget: a distillation failure never affects this response,
/// and its write may race with the next question (last write wins).
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let top_k = req.top_k.unwrap_or(state.config.retrieval.top_k);
    let response = ask::run_ask(
        &state.config,
        state.store.as_ref(),
        req.user_id.as_deref(),
        &req.message,
        top_k,
    )
    .await
    .map_err(classify_error)?;

    let config = state.config.clone();
    let store = state.store.clone();
    let user_id = sanitize_user_id(req.user_id.as_deref());
    let question = req.message.clone();
    let answer = response.answer.clone();
    tokio::spawn(async move {
        debug!(user = %user_id, "distilling exchange into memory");
        distill::distill_and_store(&config, store.as_ref(), &user_id, &question, &answer).await;
    });

    Ok(Json(response))
}
