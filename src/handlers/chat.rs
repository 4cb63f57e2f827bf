// src/handlers/chat.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{CHAT_HISTORY_WINDOW, MAX_PAGE_SIZE},
    error::AppError,
    models::chat::{ChatRequest, HistoryParams},
    services::assistant::Assistant,
    store,
    utils::jwt::Claims,
};

/// Sends one message to the assistant.
///
/// * Creates a quiz, grades a submission, or answers, depending on the intent.
/// * Messages that would reveal a pending quiz come back with `blocked: true`.
/// * Quiz creation while a quiz is pending returns 409 with the pending quiz id.
pub async fn send_message(
    State(assistant): State<Arc<Assistant>>,
    Extension(claims): Extension<Claims>,
    Json(mut req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Whitespace-only messages must fail the length check
    req.message = req.message.trim().to_string();
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let reply = assistant.handle_message(&claims.sub, &req.message).await?;

    Ok(Json(reply))
}

/// Returns the caller's recent chat messages, oldest first.
pub async fn get_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(CHAT_HISTORY_WINDOW)
        .clamp(1, MAX_PAGE_SIZE);

    let messages = store::chat::history(&pool, &claims.sub, limit).await?;

    Ok(Json(messages))
}
