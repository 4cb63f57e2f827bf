// src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{
    intent::IntentLabel,
    submission::SubmissionDetails,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Represents the 'chat_messages' table: one student's chat session.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub student_id: String,
    pub role: ChatRole,
    pub content: String,
    pub intent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// DTO for `POST /api/chat`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(
        min = 1,
        max = 4000,
        message = "Message length must be between 1 and 4000 chars"
    ))]
    pub message: String,
}

/// Reply to a student message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub intent: IntentLabel,
    pub reply: String,

    /// Set when the message was refused because of the pending quiz.
    pub blocked: bool,

    /// Quiz created by this message, or the pending quiz a refusal refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionDetails>,
}

impl ChatReply {
    pub fn text(intent: IntentLabel, reply: impl Into<String>) -> Self {
        Self {
            intent,
            reply: reply.into(),
            blocked: false,
            quiz_id: None,
            submission: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}
