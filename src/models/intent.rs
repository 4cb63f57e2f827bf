// src/models/intent.rs

use serde::{Deserialize, Serialize};

use crate::models::quiz::Answers;

/// Flat label of an intent, as stored in chat history and returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    CreateQuiz,
    SubmitQuiz,
    AskQuestion,
    DrawGraph,
    Chat,
}

impl IntentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::CreateQuiz => "create_quiz",
            IntentLabel::SubmitQuiz => "submit_quiz",
            IntentLabel::AskQuestion => "ask_question",
            IntentLabel::DrawGraph => "draw_graph",
            IntentLabel::Chat => "chat",
        }
    }
}

/// `number-letter` pairs found in a free-text message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    /// Answers for questions 1..=10, first occurrence wins.
    pub answers: Answers,
    /// Every pair matched in the text, including out-of-range question numbers.
    pub pair_count: usize,
}

/// Result of the single classification stage, consumed by the lifecycle guard
/// and the assistant.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SubmitQuiz(AnswerSheet),
    CreateQuiz,
    DrawGraph,
    AskQuestion { subject: Option<String> },
    Chat,
}

impl Intent {
    pub fn label(&self) -> IntentLabel {
        match self {
            Intent::SubmitQuiz(_) => IntentLabel::SubmitQuiz,
            Intent::CreateQuiz => IntentLabel::CreateQuiz,
            Intent::DrawGraph => IntentLabel::DrawGraph,
            Intent::AskQuestion { .. } => IntentLabel::AskQuestion,
            Intent::Chat => IntentLabel::Chat,
        }
    }
}

/// Model-side classification of a message the keyword rules could not place.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelIntent {
    pub intent: IntentLabel,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Quiz parameters extracted from a create-quiz message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub subject: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub num_questions: Option<u32>,
    /// Only set when the student named a difficulty explicitly.
    #[serde(default)]
    pub user_difficulty: Option<String>,
}

/// Leakage verdict for a message sent while a quiz is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakageVerdict {
    pub is_blocked: bool,
    #[serde(default)]
    pub reason: String,
}
