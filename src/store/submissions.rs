// src/store/submissions.rs

use chrono::{NaiveDate, Utc};
use sqlx::{SqlitePool, types::Json};

use crate::{
    config::QUIZ_QUESTION_COUNT,
    error::AppError,
    models::{
        quiz::{Answers, Page, Pagination, QuizStatus},
        submission::{Submission, SubmissionDetails, SubmissionResult},
    },
    services::grader,
    store::{self, MAX_ID_ATTEMPTS},
};

const SUBMISSION_COLUMNS: &str = "id, quiz_id, student_id, student_answers, score, \
     submission_date, daily_sequence, submitted_at";

/// Whether the student already has a graded attempt for this quiz.
pub async fn already_submitted(
    pool: &SqlitePool,
    quiz_id: &str,
    student_id: &str,
) -> Result<bool, AppError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE quiz_id = ? AND student_id = ?")
            .bind(quiz_id)
            .bind(student_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Number of submissions the student made on `date`.
pub async fn count_for_date(
    pool: &SqlitePool,
    student_id: &str,
    date: NaiveDate,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submissions WHERE student_id = ? AND submission_date = ?",
    )
    .bind(student_id)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Grades a sheet and records it.
///
/// * Rejects a second attempt for the same quiz with `AlreadySubmitted`.
/// * Scores one point per matching answer.
/// * Inserts the submission and marks the quiz `completed` in one transaction.
pub async fn submit(
    pool: &SqlitePool,
    quiz_id: &str,
    student_id: &str,
    student_answers: &Answers,
    answer_key: &Answers,
) -> Result<SubmissionResult, AppError> {
    if already_submitted(pool, quiz_id, student_id).await? {
        return Err(AppError::AlreadySubmitted {
            quiz_id: quiz_id.to_string(),
        });
    }

    let score = grader::grade(student_answers, answer_key);
    let date = store::today();
    let daily_sequence = count_for_date(pool, student_id, date).await? + 1;
    let submitted_at = Utc::now();

    for offset in 0..MAX_ID_ATTEMPTS {
        let submission_id = store::daily_id("sub", date, daily_sequence + offset);

        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO submissions (
                id, quiz_id, student_id, student_answers, score,
                submission_date, daily_sequence, submitted_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&submission_id)
        .bind(quiz_id)
        .bind(student_id)
        .bind(Json(student_answers))
        .bind(score as i64)
        .bind(date)
        .bind(daily_sequence)
        .bind(submitted_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if store::is_unique_violation(&e) => {
                tx.rollback().await?;
                if already_submitted(pool, quiz_id, student_id).await? {
                    return Err(AppError::AlreadySubmitted {
                        quiz_id: quiz_id.to_string(),
                    });
                }
                tracing::debug!(
                    "Submission id {} is taken, trying the next sequence",
                    submission_id
                );
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to save submission: {:?}", e);
                return Err(e.into());
            }
        }

        let updated = sqlx::query("UPDATE quizzes SET status = ? WHERE id = ? AND student_id = ?")
            .bind(QuizStatus::Completed)
            .bind(quiz_id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::BadRequest(format!(
                "Quiz {} does not exist or does not belong to this student",
                quiz_id
            )));
        }

        tx.commit().await?;

        tracing::info!(
            "Saved submission {} for quiz {}: {}/{}",
            submission_id,
            quiz_id,
            score,
            QUIZ_QUESTION_COUNT
        );

        return Ok(SubmissionResult {
            submission_id,
            quiz_id: quiz_id.to_string(),
            score,
            total: QUIZ_QUESTION_COUNT,
            percentage: grader::percentage(score),
            daily_sequence,
            submitted_at,
        });
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a submission id for {}",
        date
    )))
}

pub async fn get(pool: &SqlitePool, submission_id: &str) -> Result<Submission, AppError> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {} FROM submissions WHERE id = ?",
        SUBMISSION_COLUMNS
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Submission not found: {}", submission_id)))
}

/// The submission together with its per-question breakdown against `answer_key`.
pub async fn get_with_details(
    pool: &SqlitePool,
    submission_id: &str,
    answer_key: &Answers,
) -> Result<SubmissionDetails, AppError> {
    let submission = get(pool, submission_id).await?;
    Ok(SubmissionDetails::new(submission, answer_key))
}

/// The student's submissions, newest first.
pub async fn list_by_student(
    pool: &SqlitePool,
    student_id: &str,
    page: i64,
    size: i64,
) -> Result<Page<Submission>, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE student_id = ?")
        .bind(student_id)
        .fetch_one(pool)
        .await?;

    let data = sqlx::query_as::<_, Submission>(&format!(
        r#"
        SELECT {} FROM submissions
        WHERE student_id = ?
        ORDER BY submitted_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
        SUBMISSION_COLUMNS
    ))
    .bind(student_id)
    .bind(size)
    .bind((page - 1) * size)
    .fetch_all(pool)
    .await?;

    Ok(Page {
        pagination: Pagination::new(total, page, size),
        data,
    })
}
