// src/store/chat.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        chat::{ChatMessage, ChatRole},
        intent::IntentLabel,
    },
};

/// Appends a message to the student's chat session.
pub async fn record(
    pool: &SqlitePool,
    student_id: &str,
    role: ChatRole,
    content: &str,
    intent: Option<IntentLabel>,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO chat_messages (student_id, role, content, intent, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_id)
    .bind(role)
    .bind(content)
    .bind(intent.map(|i| i.as_str()))
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record chat message: {:?}", e);
        AppError::from(e)
    })?;

    Ok(result.last_insert_rowid())
}

/// The last `limit` messages of the session, oldest first.
pub async fn history(
    pool: &SqlitePool,
    student_id: &str,
    limit: i64,
) -> Result<Vec<ChatMessage>, AppError> {
    let messages = sqlx::query_as::<_, ChatMessage>(
        r#"
        SELECT id, student_id, role, content, intent, created_at
        FROM (
            SELECT id, student_id, role, content, intent, created_at
            FROM chat_messages
            WHERE student_id = ?
            ORDER BY id DESC
            LIMIT ?
        )
        ORDER BY id ASC
        "#,
    )
    .bind(student_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}
