//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{ErrorResponse, EventResponse, InboundEvent};
use super::AppState;
use crate::runtime::SseEvent;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/:user_id/events", post(post_event))
        .route("/api/users/:user_id/stream", get(stream_user))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat updates
// ============================================================

async fn post_event(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<InboundEvent>,
) -> Result<Json<EventResponse>, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user id must not be empty".to_string()));
    }
    let event = req
        .into_event()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .runtime
        .send_event(&user_id, event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(EventResponse { queued: true }))
}

async fn stream_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let broadcast_rx = state.runtime.subscribe(&user_id).await;
    sse_stream(SseEvent::Init { user_id }, broadcast_rx)
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("osmate ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
