// src/store/quizzes.rs

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json};

use crate::{
    config::{QUIZ_QUESTION_COUNT, QUIZ_TIME_LIMIT_MINUTES},
    error::AppError,
    models::quiz::{
        DailyCount, NewQuiz, Page, Pagination, Quiz, QuizFilter, QuizStats, QuizStatus,
        is_complete_key,
    },
    store::{self, MAX_ID_ATTEMPTS},
};

const QUIZ_COLUMNS: &str = "id, student_id, quiz_date, daily_sequence, content, answer_key, \
     subject, topic, difficulty, status, num_questions, time_limit, created_at";

/// Saves a new pending quiz dated today and returns its id.
///
/// The caller is expected to have checked for a pending quiz already; the
/// partial unique index still rejects a second one, reported as
/// `PendingQuiz` with the id of the quiz that is still open.
pub async fn create(pool: &SqlitePool, new: &NewQuiz) -> Result<String, AppError> {
    create_for_date(pool, new, store::today()).await
}

/// `create` with an explicit calendar day for the id and daily sequence.
pub async fn create_for_date(
    pool: &SqlitePool,
    new: &NewQuiz,
    date: NaiveDate,
) -> Result<String, AppError> {
    if !is_complete_key(&new.answer_key) {
        return Err(AppError::InvariantViolation(format!(
            "Refusing to save a quiz for student {} without a complete answer key",
            new.student_id
        )));
    }

    let daily_sequence = count_for_date(pool, &new.student_id, date).await? + 1;
    let created_at = Utc::now();

    for offset in 0..MAX_ID_ATTEMPTS {
        let quiz_id = store::daily_id("quiz", date, daily_sequence + offset);

        let result = sqlx::query(
            r#"
            INSERT INTO quizzes (
                id, student_id, quiz_date, daily_sequence, content, answer_key,
                subject, topic, difficulty, status, num_questions, time_limit, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quiz_id)
        .bind(&new.student_id)
        .bind(date)
        .bind(daily_sequence)
        .bind(&new.content)
        .bind(Json(&new.answer_key))
        .bind(&new.subject)
        .bind(&new.topic)
        .bind(&new.difficulty)
        .bind(QuizStatus::Pending)
        .bind(QUIZ_QUESTION_COUNT as i64)
        .bind(QUIZ_TIME_LIMIT_MINUTES)
        .bind(created_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!("Saved quiz {} for student {}", quiz_id, new.student_id);
                return Ok(quiz_id);
            }
            Err(e) if store::is_unique_violation(&e) => {
                if let Some(pending) = get_latest_pending(pool, &new.student_id).await? {
                    return Err(AppError::PendingQuiz {
                        quiz_id: pending.id,
                    });
                }
                tracing::debug!("Quiz id {} is taken, trying the next sequence", quiz_id);
            }
            Err(e) => {
                tracing::error!("Failed to save quiz: {:?}", e);
                return Err(e.into());
            }
        }
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a quiz id for {}",
        date
    )))
}

/// Fetches a quiz by id.
pub async fn get(pool: &SqlitePool, quiz_id: &str) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {} FROM quizzes WHERE id = ?", QUIZ_COLUMNS))
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz not found: {}", quiz_id)))
}

/// The student's most recent pending quiz, if any.
///
/// Tolerates a broken single-pending rule and logs it; the lifecycle guard
/// uses [`get_only_pending`] instead.
pub async fn get_latest_pending(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Option<Quiz>, AppError> {
    let mut pending = newest_pending(pool, student_id).await?;

    if pending.len() > 1 {
        tracing::error!(
            "Invariant violation: student {} has more than one pending quiz ({}, {})",
            student_id,
            pending[0].id,
            pending[1].id
        );
    }

    Ok(if pending.is_empty() {
        None
    } else {
        Some(pending.swap_remove(0))
    })
}

/// The student's pending quiz. More than one is an `InvariantViolation`.
pub async fn get_only_pending(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Option<Quiz>, AppError> {
    let mut pending = newest_pending(pool, student_id).await?;

    if pending.len() > 1 {
        tracing::error!(
            "Student {} has more than one pending quiz ({}, {})",
            student_id,
            pending[0].id,
            pending[1].id
        );
        return Err(AppError::InvariantViolation(format!(
            "student {} has more than one pending quiz",
            student_id
        )));
    }

    Ok(pending.pop())
}

/// Up to two pending quizzes, newest first. Two is enough to tell a broken
/// invariant apart.
async fn newest_pending(pool: &SqlitePool, student_id: &str) -> Result<Vec<Quiz>, AppError> {
    let pending = sqlx::query_as::<_, Quiz>(&format!(
        r#"
        SELECT {} FROM quizzes
        WHERE student_id = ? AND status = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT 2
        "#,
        QUIZ_COLUMNS
    ))
    .bind(student_id)
    .bind(QuizStatus::Pending)
    .fetch_all(pool)
    .await?;

    Ok(pending)
}

/// Sets the status. Re-applying the same status is a no-op; transitions are
/// not validated here.
pub async fn update_status(
    pool: &SqlitePool,
    quiz_id: &str,
    status: QuizStatus,
) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE quizzes SET status = ? WHERE id = ?")
        .bind(status)
        .bind(quiz_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if store::is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "Quiz {} cannot be reopened while another quiz is pending",
                    quiz_id
                ))
            } else {
                AppError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Quiz not found: {}", quiz_id)));
    }

    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &QuizFilter) {
    if let Some(student_id) = &filter.student_id {
        qb.push(" AND student_id = ").push_bind(student_id.clone());
    }
    if let Some(subject) = &filter.subject {
        qb.push(" AND subject = ").push_bind(subject.clone());
    }
    if let Some(difficulty) = &filter.difficulty {
        qb.push(" AND difficulty = ").push_bind(difficulty.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(date_from) = filter.date_from {
        qb.push(" AND quiz_date >= ").push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        qb.push(" AND quiz_date <= ").push_bind(date_to);
    }
}

/// One page of quizzes matching `filter`, newest first.
///
/// The total is recounted with the same filter on every call.
pub async fn list_by_filter(
    pool: &SqlitePool,
    filter: &QuizFilter,
    page: i64,
    size: i64,
) -> Result<Page<Quiz>, AppError> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM quizzes WHERE 1=1");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM quizzes WHERE 1=1",
        QUIZ_COLUMNS
    ));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(size)
        .push(" OFFSET ")
        .push_bind((page - 1) * size);

    let data: Vec<Quiz> = qb.build_query_as().fetch_all(pool).await.map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Page {
        pagination: Pagination::new(total, page, size),
        data,
    })
}

/// Most recent quiz of any status, optionally for one student.
pub async fn latest(pool: &SqlitePool, student_id: Option<&str>) -> Result<Option<Quiz>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        r#"
        SELECT {} FROM quizzes
        WHERE (? IS NULL OR student_id = ?)
        ORDER BY created_at DESC, rowid DESC
        LIMIT 1
        "#,
        QUIZ_COLUMNS
    ))
    .bind(student_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(quiz)
}

/// Number of quizzes the student created on `date`.
pub async fn count_for_date(
    pool: &SqlitePool,
    student_id: &str,
    date: NaiveDate,
) -> Result<i64, AppError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE student_id = ? AND quiz_date = ?")
            .bind(student_id)
            .bind(date)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Quizzes per day for one student, most recent day first.
pub async fn daily_counts(pool: &SqlitePool, student_id: &str) -> Result<Vec<DailyCount>, AppError> {
    let counts = sqlx::query_as::<_, DailyCount>(
        r#"
        SELECT quiz_date, COUNT(*) AS count
        FROM quizzes
        WHERE student_id = ?
        GROUP BY quiz_date
        ORDER BY quiz_date DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(counts)
}

async fn grouped_counts(
    pool: &SqlitePool,
    column: &str,
    student_id: Option<&str>,
) -> Result<Vec<(String, i64)>, AppError> {
    let rows = sqlx::query_as::<_, (String, i64)>(&format!(
        r#"
        SELECT {column}, COUNT(*)
        FROM quizzes
        WHERE {column} IS NOT NULL AND (? IS NULL OR student_id = ?)
        GROUP BY {column}
        "#
    ))
    .bind(student_id)
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Totals by subject, difficulty and status, optionally for one student.
pub async fn stats(pool: &SqlitePool, student_id: Option<&str>) -> Result<QuizStats, AppError> {
    let total_quizzes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE (? IS NULL OR student_id = ?)")
            .bind(student_id)
            .bind(student_id)
            .fetch_one(pool)
            .await?;

    Ok(QuizStats {
        total_quizzes,
        by_subject: grouped_counts(pool, "subject", student_id).await?.into_iter().collect(),
        by_difficulty: grouped_counts(pool, "difficulty", student_id)
            .await?
            .into_iter()
            .collect(),
        by_status: grouped_counts(pool, "status", student_id).await?.into_iter().collect(),
    })
}
