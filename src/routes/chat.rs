use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse},
    services::models::ChatMessage,
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let trimmed = payload.message.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let session_id = match &payload.session_id {
        Some(s) if !s.trim().is_empty() => state.sessions.ensure_session(s.trim()).await,
        _ => state.sessions.create_session().await,
    };

    state.sessions.append_message(&session_id, trimmed, false).await;

    let reply = {
        let mut usage = state.sessions.usage_for(&session_id);
        state.coach.reply(trimmed, &mut usage).await
    };
    let usage = state.sessions.get_usage(&session_id).await;
    debug!(session = %session_id, usage = ?usage.snapshot(Instant::now()), "session usage");

    state.metrics.record_reply(&reply).await;
    state.sessions.append_message(&session_id, reply.text.as_str(), true).await;
    info!(
        session = %session_id,
        category = reply.category.map(|c| c.as_str()).unwrap_or("-"),
        source = reply.source.as_str(),
        "chat reply"
    );

    Ok(Json(ChatResponse {
        session_id,
        reply: reply.text,
        category: reply.category.map(|c| c.as_str().to_string()),
        source: reply.source.as_str().to_string(),
    }))
}

pub async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    state
        .sessions
        .get_history(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("unknown session {session_id}")))
}

pub async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("unknown session {session_id}")))
    }
}
