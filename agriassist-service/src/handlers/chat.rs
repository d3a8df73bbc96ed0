use crate::dtos::{ChatRequest, ChatResponse, DEFAULT_SESSION_ID};
use crate::models::Turn;
use crate::services::Language;
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;

const NO_MESSAGE: &str = "No message provided";

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected chat body");
        AppError::bad_request(NO_MESSAGE)
    })?;

    // Only absent or empty messages are rejected; whitespace goes to the model.
    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::bad_request(NO_MESSAGE))?;
    let session_id = request
        .session_id
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let language = Language::from_code(request.language.as_deref().unwrap_or_default());

    // Concurrent calls on one session may both see the same history.
    let history = state.sessions.history(&session_id).await?;
    let response = state.advisor.chat(&message, &history, language).await?;

    state
        .sessions
        .append(&session_id, &[Turn::user(message), Turn::model(response.as_str())])
        .await?;

    tracing::info!(
        session_id = %session_id,
        turns = history.len() + 2,
        "Chat turn recorded"
    );

    Ok(Json(ChatResponse {
        success: true,
        response,
        session_id,
    }))
}
