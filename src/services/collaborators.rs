// src/services/collaborators.rs

//! Boundaries to the services the assistant calls out to.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        chat::ChatMessage,
        intent::{Intent, LeakageVerdict, ModelIntent, QuizRequest},
        profile::{StudentInfo, StudentProfile},
        question::RetrievedQuestion,
        quiz::{Answers, Quiz},
    },
};

/// Language-model side of intent handling.
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Classifies a message the keyword rules could not place.
    async fn classify(&self, message: &str) -> Result<ModelIntent, AppError>;

    /// Extracts subject, topic and difficulty from a create-quiz message.
    /// `Ok(None)` means the request could not be understood.
    async fn extract_quiz_request(&self, message: &str) -> Result<Option<QuizRequest>, AppError>;

    /// Decides whether answering `message` would reveal the pending quiz.
    async fn check_leakage(&self, message: &str, quiz: &Quiz) -> Result<LeakageVerdict, AppError>;
}

/// What the generator is asked to produce.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSpec {
    pub subject: String,
    pub topic: String,
    /// Vietnamese difficulty label.
    pub difficulty: String,
    pub student: StudentInfo,
    /// Set on the retry after a malformed first attempt.
    pub format_reminder: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratedQuiz {
    pub quiz_markdown: String,
    /// `None` when the generator returned no usable key.
    pub answer_key: Option<Answers>,
}

#[async_trait]
pub trait QuizGenerator: Send + Sync {
    async fn generate(&self, spec: &QuizSpec) -> Result<GeneratedQuiz, AppError>;
}

/// Similarity search over the indexed exam-question bank.
#[async_trait]
pub trait QuestionRetriever: Send + Sync {
    /// Up to `top_k` questions closest to `query`, restricted to `subject` when given.
    async fn search(
        &self,
        query: &str,
        subject: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<RetrievedQuestion>, AppError>;
}

/// Answers questions, graph requests and small talk.
#[async_trait]
pub trait Responder: Send + Sync {
    /// `related` holds question-bank hits for subject questions, empty otherwise.
    async fn answer(
        &self,
        message: &str,
        intent: &Intent,
        history: &[ChatMessage],
        related: &[RetrievedQuestion],
    ) -> Result<String, AppError>;
}

#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn get(&self, student_id: &str) -> Result<Option<StudentProfile>, AppError>;
}
