// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed submission, unknown quiz, nothing to submit)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    /// 409: the student still has this quiz open.
    PendingQuiz { quiz_id: String },

    /// 409: this quiz was already graded for the student.
    AlreadySubmitted { quiz_id: String },

    /// 500: stored state contradicts the lifecycle rules (missing answer key,
    /// several pending quizzes). Always a bug in the creation path.
    InvariantViolation(String),

    /// 502: the language model or another collaborator failed.
    UpstreamFailure(String),
}

impl AppError {
    /// Identifier of the resource a conflict refers to, if any.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            AppError::PendingQuiz { quiz_id } | AppError::AlreadySubmitted { quiz_id } => {
                Some(quiz_id)
            }
            _ => None,
        }
    }

    /// Message safe to show to the student.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InternalServerError(_) | AppError::InvariantViolation(_) => {
                "Internal Server Error".to_string()
            }
            AppError::UpstreamFailure(_) => {
                "The assistant is unavailable right now, please try again.".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::PendingQuiz { quiz_id } => format!(
                "Quiz {} is still pending. Submit your answers before creating a new quiz.",
                quiz_id
            ),
            AppError::AlreadySubmitted { quiz_id } => {
                format!("Quiz {} has already been submitted.", quiz_id)
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvariantViolation(msg) => {
                tracing::error!("Invariant violation: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::UpstreamFailure(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                StatusCode::BAD_GATEWAY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::PendingQuiz { .. }
            | AppError::AlreadySubmitted { .. } => StatusCode::CONFLICT,
        };

        let body = match self.resource_id() {
            Some(id) => Json(json!({
                "error": self.user_message(),
                "resource_id": id,
            })),
            None => Json(json!({
                "error": self.user_message(),
            })),
        };

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamFailure(err.to_string())
    }
}
