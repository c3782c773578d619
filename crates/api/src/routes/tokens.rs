//! Per-chat tracked token routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use pump_common::error::AppError;
use pump_common::types::{ChatId, TrackedToken};
use pump_engine::tracking::{TokenStatus, TrackOutcome};

use crate::middleware::auth::ApiKey;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/chats/{chat_id}/tokens",
            get(list_tokens).post(track_token).delete(clear_tokens),
        )
        .route("/api/chats/{chat_id}/tokens/{mint}", delete(untrack_token))
        .route("/api/chats/{chat_id}/status", get(chat_status))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub mint: String,
    pub multiplier: f64,
}

/// GET /api/chats/:chat_id/tokens: Stored tokens of a chat.
async fn list_tokens(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Vec<TrackedToken>>, AppError> {
    let tokens = state.tracking.list(chat_id).await?;
    Ok(Json(tokens))
}

/// GET /api/chats/:chat_id/status: Stored tokens with live market caps.
async fn chat_status(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Vec<TokenStatus>>, AppError> {
    let statuses = state.tracking.status(chat_id).await?;
    Ok(Json(statuses))
}

/// POST /api/chats/:chat_id/tokens: Track (or re-track) a token.
async fn track_token(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(chat_id): Path<ChatId>,
    Json(req): Json<TrackRequest>,
) -> Result<(StatusCode, Json<TrackOutcome>), AppError> {
    let outcome = state
        .tracking
        .track(chat_id, &req.mint, req.multiplier)
        .await?;

    let status = if outcome.previous.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// DELETE /api/chats/:chat_id/tokens/:mint: Stop tracking one token.
async fn untrack_token(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path((chat_id, mint)): Path<(ChatId, String)>,
) -> Result<Json<TrackedToken>, AppError> {
    match state.tracking.untrack(chat_id, &mint).await? {
        Some(token) => Ok(Json(token)),
        None => Err(AppError::NotFound(format!(
            "Token {} is not tracked by chat {}",
            mint, chat_id
        ))),
    }
}

/// DELETE /api/chats/:chat_id/tokens: Stop tracking every token of a chat.
async fn clear_tokens(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.tracking.clear(chat_id).await?;
    Ok(Json(json!({ "removed": removed })))
}
