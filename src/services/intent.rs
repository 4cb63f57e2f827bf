// src/services/intent.rs

//! Intent classification.
//!
//! One stage turns a message into an [`Intent`]: keyword and pattern rules
//! first, the language model only when the rules cannot decide. Every other
//! component reads the resulting `Intent` instead of re-running its own
//! keyword checks.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::{
    config::{SUBJECT_CONFIDENCE_THRESHOLD, SUBMISSION_PAIR_THRESHOLD},
    models::intent::{Intent, IntentLabel},
    services::{answer_sheet, collaborators::IntentModel},
};

const SUBMISSION_KEYWORDS: &[&str] = &[
    "nộp bài",
    "nộp đề",
    "nộp quiz",
    "submit",
    "chấm bài",
    "chấm điểm",
    "bài làm của",
    "đáp án của em",
    "đáp án của tôi",
    "đáp án của mình",
];

/// Phrases that only ever mean "give me a quiz".
const QUIZ_PHRASES: &[&str] = &[
    "tạo đề",
    "ra đề",
    "đề kiểm tra",
    "đề thi",
    "tạo quiz",
    "tạo bài kiểm tra",
    "ra bài kiểm tra",
    "tạo bài trắc nghiệm",
];

static QUIZ_REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(cho|giao)\s+(em|mình|tôi|tớ|con)\s+(một\s+|1\s+)?(bài|đề)\s+(kiểm tra|thi|trắc nghiệm|quiz)\b")
        .expect("valid quiz request regex")
});

/// Subjects a student may name when asking for a quiz, including the ones
/// quizzes are not offered for. Whole words only.
static QUIZ_SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(toán|lý|hóa|sinh|văn|anh|sử|địa)\b").expect("valid quiz subject regex")
});

static QUIZ_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(quiz|trắc nghiệm|kiểm tra|15 phút|30 phút)\b").expect("valid quiz word regex")
});

const GRAPH_KEYWORDS: &[&str] = &["vẽ đồ thị", "vẽ đồ", "đồ thị", "graph", "plot", "vẽ hàm"];

const QUESTION_WORDS: &[&str] = &["gì", "nào", "như thế nào", "tại sao", "là gì", "?"];

/// Subject name and the keywords that point to it.
const SUBJECT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Vật lý",
        &["vật lý", "physics", "lực", "năng lượng", "điện", "từ trường", "quang", "nhiệt"],
    ),
    (
        "Hóa học",
        &["hóa học", "chemistry", "phản ứng", "nguyên tố", "hợp chất", "ion"],
    ),
    (
        "Sinh học",
        &["sinh học", "biology", "tế bào", "gen", "protein", "dna"],
    ),
    (
        "Toán",
        &["toán", "math", "phương trình", "hàm số", "số học"],
    ),
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

pub fn is_submission(lower: &str, pair_count: usize) -> bool {
    contains_any(lower, SUBMISSION_KEYWORDS) || pair_count >= SUBMISSION_PAIR_THRESHOLD
}

pub fn is_quiz_request(lower: &str) -> bool {
    contains_any(lower, QUIZ_PHRASES) || QUIZ_REQUEST_RE.is_match(lower)
}

/// A subject next to a quiz word ("quiz sinh học"). Too weak to decide on:
/// "học sinh" and "kiểm tra lại" trip it as well.
pub fn looks_like_quiz_request(lower: &str) -> bool {
    QUIZ_SUBJECT_RE.is_match(lower) && QUIZ_WORD_RE.is_match(lower)
}

pub fn is_graph_request(lower: &str) -> bool {
    contains_any(lower, GRAPH_KEYWORDS)
}

/// Subject named by a subject question, if the message is one.
pub fn subject_question(lower: &str) -> Option<&'static str> {
    if !contains_any(lower, QUESTION_WORDS) {
        return None;
    }
    SUBJECT_KEYWORDS
        .iter()
        .find(|(_, words)| contains_any(lower, words))
        .map(|(subject, _)| *subject)
}

/// Rule-based detection. `None` means the rules could not decide.
///
/// Priority: submission, quiz creation, graph, subject question. A weak quiz
/// match is left to the model.
pub fn detect(message: &str) -> Option<Intent> {
    let lower = message.to_lowercase();
    let sheet = answer_sheet::parse(message);

    if is_submission(&lower, sheet.pair_count) {
        return Some(Intent::SubmitQuiz(sheet));
    }
    if is_quiz_request(&lower) {
        return Some(Intent::CreateQuiz);
    }
    if is_graph_request(&lower) {
        return Some(Intent::DrawGraph);
    }
    if looks_like_quiz_request(&lower) {
        return None;
    }
    subject_question(&lower).map(|subject| Intent::AskQuestion {
        subject: Some(subject.to_string()),
    })
}

/// Produces the single `Intent` for each incoming message.
#[derive(Clone)]
pub struct IntentRouter {
    model: Arc<dyn IntentModel>,
}

impl IntentRouter {
    pub fn new(model: Arc<dyn IntentModel>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, message: &str) -> Intent {
        if let Some(intent) = detect(message) {
            tracing::debug!("Rule-based intent: {:?}", intent.label());
            return intent;
        }

        match self.model.classify(message).await {
            Ok(result) => {
                tracing::debug!(
                    "Model intent: {:?} (subject: {:?}, confidence: {:.2})",
                    result.intent,
                    result.subject,
                    result.confidence
                );
                match result.intent {
                    IntentLabel::SubmitQuiz => Intent::SubmitQuiz(answer_sheet::parse(message)),
                    IntentLabel::CreateQuiz => Intent::CreateQuiz,
                    IntentLabel::DrawGraph => Intent::DrawGraph,
                    IntentLabel::AskQuestion
                        if result.confidence >= SUBJECT_CONFIDENCE_THRESHOLD =>
                    {
                        Intent::AskQuestion {
                            subject: result.subject,
                        }
                    }
                    IntentLabel::AskQuestion | IntentLabel::Chat => Intent::Chat,
                }
            }
            Err(e) => {
                tracing::warn!("Intent model failed, falling back to chat: {}", e);
                Intent::Chat
            }
        }
    }
}
