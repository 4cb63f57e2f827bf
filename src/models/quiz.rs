// src/models/quiz.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::config::{DEFAULT_PAGE_SIZE, QUIZ_QUESTION_COUNT};

/// Question number (1-based) mapped to an option letter (`A`-`D`, uppercase).
/// Used both for answer keys and for parsed student answers.
pub type Answers = BTreeMap<u32, char>;

/// Lifecycle status of a quiz. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Pending,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Pending => "pending",
            QuizStatus::Completed => "completed",
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quiz {
    /// `quiz_<YYYYMMDD>_<NNN>`.
    pub id: String,
    pub student_id: String,
    pub quiz_date: NaiveDate,

    /// 1-based count of the student's quizzes on `quiz_date`.
    pub daily_sequence: i64,

    /// Markdown body, questions and options only.
    pub content: String,

    /// Never serialized: the key is only revealed through graded submissions.
    #[serde(skip_serializing)]
    pub answer_key: Json<Answers>,

    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub status: QuizStatus,
    pub num_questions: i64,
    pub time_limit: i64,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn is_pending(&self) -> bool {
        self.status == QuizStatus::Pending
    }
}

/// Returns true when `key` holds a letter for every question 1..=10.
pub fn is_complete_key(key: &Answers) -> bool {
    (1..=QUIZ_QUESTION_COUNT).all(|n| key.contains_key(&n))
}

/// Input for `store::quizzes::create`.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub student_id: String,
    pub content: String,
    pub answer_key: Answers,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}

/// Optional filters for listing quizzes. Every field narrows the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizFilter {
    pub student_id: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<QuizStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Query parameters for `GET /api/quizzes`.
#[derive(Debug, Deserialize, Validate)]
pub struct QuizListParams {
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub status: Option<QuizStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,

    /// Only honoured on the admin listing.
    pub student_id: Option<String>,

    #[validate(range(min = 1, message = "page starts from 1"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: Option<i64>,
}

impl QuizListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn into_filter(self, student_id: Option<String>) -> QuizFilter {
        QuizFilter {
            student_id,
            subject: self.subject,
            difficulty: self.difficulty,
            status: self.status,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(total: i64, page: i64, size: i64) -> Self {
        let total_pages = if size > 0 { (total + size - 1) / size } else { 0 };
        Self {
            total,
            page,
            size,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    pub data: Vec<T>,
}

/// Quiz counts per day for one student.
#[derive(Debug, Serialize, FromRow)]
pub struct DailyCount {
    pub quiz_date: NaiveDate,
    pub count: i64,
}

/// Aggregated quiz statistics.
#[derive(Debug, Default, Serialize)]
pub struct QuizStats {
    pub total_quizzes: i64,
    pub by_subject: HashMap<String, i64>,
    pub by_difficulty: HashMap<String, i64>,
    pub by_status: HashMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_up_pages() {
        let p = Pagination::new(41, 2, 20);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(40, 2, 20);
        assert_eq!(last.total_pages, 2);
        assert!(!last.has_next);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let p = Pagination::new(0, 1, 20);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn complete_key_needs_all_ten_questions() {
        let mut key: Answers = (1..=10).map(|n| (n, 'A')).collect();
        assert!(is_complete_key(&key));
        key.remove(&7);
        assert!(!is_complete_key(&key));
    }
}
