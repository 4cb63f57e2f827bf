// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::submission::{SubmissionDetails, SubmissionListParams},
    store::{quizzes, submissions},
    utils::jwt::Claims,
};

/// Lists the caller's graded submissions, newest first.
pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SubmissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let page = submissions::list_by_student(&pool, &claims.sub, params.page(), params.size()).await?;

    Ok(Json(page))
}

/// Returns one submission with its per-question breakdown.
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submission = submissions::get(&pool, &id).await?;
    if submission.student_id != claims.sub {
        return Err(AppError::NotFound(format!("Submission {} not found", id)));
    }

    let quiz = quizzes::get(&pool, &submission.quiz_id).await?;

    Ok(Json(SubmissionDetails::new(submission, &quiz.answer_key)))
}
