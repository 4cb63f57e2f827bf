// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::QuizListParams,
    store::quizzes,
    utils::jwt::Claims,
};

/// Lists the caller's quizzes, newest first, with optional filters.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (page, size) = (params.page(), params.size());
    let filter = params.into_filter(Some(claims.sub));
    let quizzes = quizzes::list_by_filter(&pool, &filter, page, size).await?;

    Ok(Json(quizzes))
}

/// Returns one of the caller's quizzes. The answer key is never included.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::get(&pool, &id).await?;

    // Other students' quizzes look the same as missing ones
    if quiz.student_id != claims.sub {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }

    Ok(Json(quiz))
}

pub async fn latest_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::latest(&pool, Some(&claims.sub))
        .await?
        .ok_or_else(|| AppError::NotFound("No quizzes yet".to_string()))?;

    Ok(Json(quiz))
}

/// The caller's open quiz, or `null`.
pub async fn pending_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = quizzes::get_latest_pending(&pool, &claims.sub).await?;
    Ok(Json(quiz))
}

/// Number of quizzes created per day by the caller.
pub async fn daily_counts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let counts = quizzes::daily_counts(&pool, &claims.sub).await?;
    Ok(Json(counts))
}

pub async fn quiz_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let stats = quizzes::stats(&pool, Some(&claims.sub)).await?;
    Ok(Json(stats))
}

/// Lists quizzes across all students.
/// Admin only. Honours the `student_id` filter.
pub async fn admin_list_quizzes(
    State(pool): State<SqlitePool>,
    Query(mut params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (page, size) = (params.page(), params.size());
    let student_id = params.student_id.take();
    let filter = params.into_filter(student_id);
    let quizzes = quizzes::list_by_filter(&pool, &filter, page, size).await?;

    Ok(Json(quizzes))
}

/// Stats across all students.
/// Admin only.
pub async fn admin_quiz_stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let stats = quizzes::stats(&pool, None).await?;
    Ok(Json(stats))
}
