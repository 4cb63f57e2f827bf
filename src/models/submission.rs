// src/models/submission.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::{
    config::{DEFAULT_PAGE_SIZE, QUIZ_QUESTION_COUNT},
    models::quiz::Answers,
    services::grader,
};

/// Represents the 'submissions' table in the database.
/// One graded attempt per (quiz, student).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    /// `sub_<YYYYMMDD>_<NNN>`.
    pub id: String,
    pub quiz_id: String,
    pub student_id: String,
    pub student_answers: Json<Answers>,
    pub score: i64,
    pub submission_date: NaiveDate,
    pub daily_sequence: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Outcome of `store::submissions::submit`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub submission_id: String,
    pub quiz_id: String,
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub daily_sequence: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Per-question grading line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_number: u32,
    pub correct_answer: String,
    /// `"?"` when the student left the question out.
    pub student_answer: String,
    pub is_correct: bool,
}

/// A submission with its derived per-question breakdown. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionDetails {
    #[serde(flatten)]
    pub submission: Submission,
    pub details: Vec<QuestionResult>,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub total: u32,
}

impl SubmissionDetails {
    pub fn new(submission: Submission, answer_key: &Answers) -> Self {
        let details = grader::breakdown(&submission.student_answers, answer_key);
        let correct_count = details.iter().filter(|d| d.is_correct).count();
        Self {
            incorrect_count: details.len() - correct_count,
            correct_count,
            details,
            submission,
            total: QUIZ_QUESTION_COUNT,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmissionListParams {
    #[validate(range(min = 1, message = "page starts from 1"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: Option<i64>,
}

impl SubmissionListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}
