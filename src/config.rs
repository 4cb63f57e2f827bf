// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Number of questions in every generated quiz.
pub const QUIZ_QUESTION_COUNT: u32 = 10;

/// Options per question (A-D).
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Quizzes are always the 15-minute format.
pub const QUIZ_TIME_LIMIT_MINUTES: i64 = 15;

/// A bare message with at least this many `number-letter` pairs is treated as a submission.
pub const SUBMISSION_PAIR_THRESHOLD: usize = 5;

/// Minimum model confidence for a subject question to be answered as one.
pub const SUBJECT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// The four natural-science subjects quizzes can be generated for.
pub const ALLOWED_QUIZ_SUBJECTS: [&str; 4] = ["Toán", "Vật lý", "Hóa học", "Sinh học"];

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Number of previous chat messages handed to the responder.
pub const CHAT_HISTORY_WINDOW: i64 = 10;

/// Question-bank hits attached to a subject question.
pub const RETRIEVAL_TOP_K: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub listen_addr: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub embedding_model: String,
    /// Question search is off when unset.
    pub qdrant_url: Option<String>,
    pub qdrant_collection: String,
    pub student_profile_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://database/quiz_storage.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let openai_api_key = env::var("OPENAI_API_KEY")
            .expect("OPENAI_API_KEY must be set");

        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let openai_model = env::var("OPENAI_MODEL")
            .unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let embedding_model = env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-large".to_string());

        let qdrant_url = env::var("QDRANT_URL").ok().filter(|url| !url.trim().is_empty());

        let qdrant_collection = env::var("QDRANT_COLLECTION")
            .unwrap_or_else(|_| "KHTN_QA".to_string());

        let student_profile_path = env::var("STUDENT_PROFILE_PATH")
            .unwrap_or_else(|_| "data/api/student.json".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            listen_addr,
            openai_api_key,
            openai_base_url,
            openai_model,
            embedding_model,
            qdrant_url,
            qdrant_collection,
            student_profile_path,
        }
    }
}
