// src/services/lifecycle.rs

//! Pending-quiz guard.
//!
//! A student is either free (no pending quiz) or busy with exactly one
//! pending quiz. The guard runs once per message, before any feature is
//! dispatched, and tells the caller what the message is allowed to do.
//! It never writes to the stores, and refuses to decide anything for a
//! student found with two pending quizzes.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        intent::{AnswerSheet, Intent},
        quiz::Quiz,
    },
    services::collaborators::IntentModel,
    store::quizzes,
};

/// Outcome of [`LifecycleGuard::evaluate`].
#[derive(Debug, Clone)]
pub enum GuardDecision {
    /// Handle the message normally. `pending` is the open quiz, if any.
    Proceed { pending: Option<Quiz> },
    /// Grade `sheet` against the pending quiz.
    Grade { quiz: Quiz, sheet: AnswerSheet },
    /// Submission with no pending quiz.
    NothingToSubmit,
    /// Quiz creation while `pending_quiz_id` is still open.
    BlockCreation { pending_quiz_id: String },
    /// The message would reveal the pending quiz.
    BlockLeakage { pending_quiz_id: String, reason: String },
}

#[derive(Clone)]
pub struct LifecycleGuard {
    pool: SqlitePool,
    model: Arc<dyn IntentModel>,
}

impl LifecycleGuard {
    pub fn new(pool: SqlitePool, model: Arc<dyn IntentModel>) -> Self {
        Self { pool, model }
    }

    pub async fn evaluate(
        &self,
        student_id: &str,
        intent: &Intent,
        message: &str,
    ) -> Result<GuardDecision, AppError> {
        let Some(pending) = quizzes::get_only_pending(&self.pool, student_id).await? else {
            return Ok(match intent {
                Intent::SubmitQuiz(_) => GuardDecision::NothingToSubmit,
                _ => GuardDecision::Proceed { pending: None },
            });
        };

        match intent {
            Intent::SubmitQuiz(sheet) => Ok(GuardDecision::Grade {
                quiz: pending,
                sheet: sheet.clone(),
            }),
            Intent::CreateQuiz => {
                tracing::info!(
                    "Blocked quiz creation for {}: {} is pending",
                    student_id,
                    pending.id
                );
                Ok(GuardDecision::BlockCreation {
                    pending_quiz_id: pending.id,
                })
            }
            _ => {
                let verdict = match self.model.check_leakage(message, &pending).await {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        tracing::warn!(
                            "Leakage check failed for {}, blocking message: {}",
                            student_id,
                            e
                        );
                        return Ok(GuardDecision::BlockLeakage {
                            pending_quiz_id: pending.id,
                            reason: "leakage check unavailable".to_string(),
                        });
                    }
                };

                if verdict.is_blocked {
                    tracing::info!(
                        "Blocked message from {} during {}: {}",
                        student_id,
                        pending.id,
                        verdict.reason
                    );
                    Ok(GuardDecision::BlockLeakage {
                        pending_quiz_id: pending.id,
                        reason: verdict.reason,
                    })
                } else {
                    Ok(GuardDecision::Proceed {
                        pending: Some(pending),
                    })
                }
            }
        }
    }
}
