//! HTTP API.
//!
//! - GET /          front-end document
//! - POST /api/ask  forward a prompt upstream
//! - GET /health
//!
//! Any other path is looked up in the static directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::server::frontend::load_index;
use crate::upstream::Assistant;

/// Application state shared across handlers.
pub struct AppState {
    pub assistant: Assistant,
    pub index_html: String,
    pub static_dir: PathBuf,
    pub max_body_bytes: Option<usize>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(assistant: Assistant, config: &ServerConfig) -> Self {
        Self {
            assistant,
            index_html: load_index(&config.static_dir),
            static_dir: config.static_dir.clone(),
            max_body_bytes: config.max_body_bytes,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    let body_limit = match state.max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(index))
        .route("/api/ask", post(ask))
        .route("/health", get(health))
        .fallback_service(static_files)
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub upstream: String,
    pub model: Option<String>,
    pub uptime_secs: u64,
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// Client-input errors, returned with an `error` body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("请求必须是JSON格式")]
    InvalidJson(#[source] JsonRejection),

    #[error("请求体读取失败: {}", .0.body_text())]
    UnreadableBody(#[source] BytesRejection),

    #[error("请求中缺少'prompt'字段")]
    MissingPrompt,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::BytesRejection(inner) => ApiError::UnreadableBody(inner),
            other => ApiError::InvalidJson(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnreadableBody(rejection) => rejection.status(),
            ApiError::InvalidJson(_) | ApiError::MissingPrompt => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InvalidJson(rejection) = &self {
            debug!(detail = %rejection.body_text(), "Rejected request body");
        }
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(req) = payload?;
    let prompt = req
        .prompt
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingPrompt)?;

    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("ask", request_id = %request_id);

    let outcome = state.assistant.ask(&prompt).instrument(span).await;
    info!(request_id = %request_id, answered = outcome.is_answered(), "Ask request complete");

    Ok(Json(AskResponse {
        response: outcome.into_text(),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let available = state.assistant.is_available();
    Json(HealthResponse {
        status: "ok".to_string(),
        upstream: if available { "ready" } else { "unavailable" }.to_string(),
        model: state.assistant.model().map(str::to_string),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
