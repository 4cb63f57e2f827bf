// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use quiz_lifecycle::{
    error::AppError,
    models::{
        chat::ChatMessage,
        intent::{Intent, IntentLabel, LeakageVerdict, ModelIntent, QuizRequest},
        profile::StudentProfile,
        question::RetrievedQuestion,
        quiz::{Answers, NewQuiz, Quiz},
    },
    services::{
        answer_sheet,
        assistant::{Assistant, Collaborators},
        collaborators::{
            GeneratedQuiz, IntentModel, ProfileProvider, QuestionRetriever, QuizGenerator,
            QuizSpec, Responder,
        },
    },
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tempfile::TempDir;

/// Key used by every generated test quiz.
pub const ANSWER_KEY: &str = "1-A,2-B,3-C,4-D,5-A,6-B,7-C,8-D,9-A,10-B";

pub fn answer_key() -> Answers {
    answer_sheet::parse_key(ANSWER_KEY)
}

/// Fresh in-memory database with the schema applied.
///
/// A single connection that never expires, so every query sees the same
/// in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Migrated database in a temporary file, shared by several connections so
/// writes can actually race. Keep the `TempDir` alive for the test.
pub async fn file_pool(max_connections: u32) -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::with_prefix("quiz-lifecycle-db").expect("Failed to create temp dir");
    let options = SqliteConnectOptions::new()
        .filename(temp_dir.path().join("quiz.db"))
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("Failed to open SQLite file");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    (temp_dir, pool)
}

pub fn new_quiz(student_id: &str) -> NewQuiz {
    NewQuiz {
        student_id: student_id.to_string(),
        content: well_formed_quiz(),
        answer_key: answer_key(),
        subject: Some("Vật lý".to_string()),
        topic: Some("Lực".to_string()),
        difficulty: Some("trung bình".to_string()),
    }
}

pub fn well_formed_quiz() -> String {
    let mut md = String::from("# ĐỀ KIỂM TRA 15 PHÚT - VẬT LÝ\n**Chủ đề**: Lực\n---\n");
    for n in 1..=10 {
        md.push_str(&format!(
            "## **Câu {}**: Câu hỏi số {}?\n**A.** 1  \n**B.** 2  \n**C.** 3  \n**D.** 4\n",
            n, n
        ));
    }
    md.push_str("---\n_Hết_");
    md
}

/// Rule-free stand-in for the language model.
///
/// * Unplaced messages are small talk.
/// * Quiz requests naming "vật lý" or "văn" are understood, others are not.
/// * Messages mentioning a question number or the answers leak the quiz.
#[derive(Default)]
pub struct FakeModel {
    pub leakage_unavailable: AtomicBool,
    pub leakage_checks: AtomicUsize,
}

#[async_trait]
impl IntentModel for FakeModel {
    async fn classify(&self, _message: &str) -> Result<ModelIntent, AppError> {
        Ok(ModelIntent {
            intent: IntentLabel::Chat,
            subject: None,
            confidence: 0.9,
        })
    }

    async fn extract_quiz_request(&self, message: &str) -> Result<Option<QuizRequest>, AppError> {
        let lower = message.to_lowercase();
        let subject = if lower.contains("vật lý") {
            "Vật lý"
        } else if lower.contains("văn") {
            "Ngữ văn"
        } else {
            return Ok(None);
        };

        Ok(Some(QuizRequest {
            subject: Some(subject.to_string()),
            topic: Some("Lực".to_string()),
            num_questions: Some(10),
            user_difficulty: None,
        }))
    }

    async fn check_leakage(&self, message: &str, _quiz: &Quiz) -> Result<LeakageVerdict, AppError> {
        self.leakage_checks.fetch_add(1, Ordering::SeqCst);
        if self.leakage_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamFailure("model offline".to_string()));
        }

        let lower = message.to_lowercase();
        let is_blocked = lower.contains("câu") || lower.contains("đáp án");
        Ok(LeakageVerdict {
            is_blocked,
            reason: if is_blocked { "asks about the quiz" } else { "unrelated" }.to_string(),
        })
    }
}

/// Returns `malformed_attempts` broken quizzes before a well-formed one.
#[derive(Default)]
pub struct FakeGenerator {
    pub malformed_attempts: usize,
    pub calls: AtomicUsize,
    pub reminders: AtomicUsize,
}

#[async_trait]
impl QuizGenerator for FakeGenerator {
    async fn generate(&self, spec: &QuizSpec) -> Result<GeneratedQuiz, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if spec.format_reminder {
            self.reminders.fetch_add(1, Ordering::SeqCst);
        }

        let quiz_markdown = if call < self.malformed_attempts {
            "## Câu 1: thiếu định dạng\nA. 1\nB. 2".to_string()
        } else {
            well_formed_quiz()
        };

        Ok(GeneratedQuiz {
            quiz_markdown,
            answer_key: Some(answer_key()),
        })
    }
}

/// Echoes the message, followed by the ids of any related questions it was given.
pub struct FakeResponder;

#[async_trait]
impl Responder for FakeResponder {
    async fn answer(
        &self,
        message: &str,
        intent: &Intent,
        _history: &[ChatMessage],
        related: &[RetrievedQuestion],
    ) -> Result<String, AppError> {
        let mut reply = format!("[{}] {}", intent.label().as_str(), message);
        if !related.is_empty() {
            let ids: Vec<&str> = related.iter().map(|q| q.question_id.as_str()).collect();
            reply.push_str(&format!(" (refs: {})", ids.join(", ")));
        }
        Ok(reply)
    }
}

/// Question bank holding a single physics question. Records every search
/// as `(query, subject, top_k)`.
#[derive(Default)]
pub struct FakeRetriever {
    pub unavailable: AtomicBool,
    pub searches: Mutex<Vec<(String, Option<String>, usize)>>,
}

impl FakeRetriever {
    pub fn searches(&self) -> Vec<(String, Option<String>, usize)> {
        self.searches.lock().unwrap().clone()
    }
}

pub fn bank_question() -> RetrievedQuestion {
    RetrievedQuestion {
        question_id: "vl_10_021".to_string(),
        question: "Đơn vị của lực trong hệ SI là gì?".to_string(),
        options: BTreeMap::from([
            ("A".to_string(), "Jun".to_string()),
            ("B".to_string(), "Niutơn".to_string()),
            ("C".to_string(), "Oát".to_string()),
            ("D".to_string(), "Paxcan".to_string()),
        ]),
        correct_answer: "B".to_string(),
        correct_answer_text: "Niutơn".to_string(),
        subject: "Vật lý".to_string(),
        primary_page: None,
        score: 0.82,
    }
}

#[async_trait]
impl QuestionRetriever for FakeRetriever {
    async fn search(
        &self,
        query: &str,
        subject: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedQuestion>, AppError> {
        self.searches.lock().unwrap().push((
            query.to_string(),
            subject.map(str::to_string),
            top_k,
        ));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamFailure("vector store offline".to_string()));
        }

        let hits = [bank_question()]
            .into_iter()
            .filter(|q| subject.is_none_or(|s| s == q.subject))
            .take(top_k)
            .collect();
        Ok(hits)
    }
}

pub struct NoProfiles;

#[async_trait]
impl ProfileProvider for NoProfiles {
    async fn get(&self, _student_id: &str) -> Result<Option<StudentProfile>, AppError> {
        Ok(None)
    }
}

pub struct TestAssistant {
    pub pool: SqlitePool,
    pub assistant: Assistant,
    pub model: Arc<FakeModel>,
    pub generator: Arc<FakeGenerator>,
    pub retriever: Arc<FakeRetriever>,
}

pub async fn test_assistant() -> TestAssistant {
    test_assistant_with(FakeGenerator::default()).await
}

pub async fn test_assistant_with(generator: FakeGenerator) -> TestAssistant {
    let pool = test_pool().await;
    let model = Arc::new(FakeModel::default());
    let generator = Arc::new(generator);
    let retriever = Arc::new(FakeRetriever::default());

    let assistant = Assistant::new(
        pool.clone(),
        Collaborators {
            model: model.clone(),
            generator: generator.clone(),
            responder: Arc::new(FakeResponder),
            profiles: Arc::new(NoProfiles),
            retriever: Some(retriever.clone() as Arc<dyn QuestionRetriever>),
        },
    );

    TestAssistant {
        pool,
        assistant,
        model,
        generator,
        retriever,
    }
}
