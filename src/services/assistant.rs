// src/services/assistant.rs

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    config::{ALLOWED_QUIZ_SUBJECTS, CHAT_HISTORY_WINDOW, QUIZ_QUESTION_COUNT, RETRIEVAL_TOP_K},
    error::AppError,
    models::{
        chat::{ChatMessage, ChatReply, ChatRole},
        intent::{AnswerSheet, Intent, IntentLabel},
        profile::{StudentInfo, difficulty_label},
        question::RetrievedQuestion,
        quiz::{NewQuiz, Quiz, is_complete_key},
        submission::SubmissionDetails,
    },
    services::{
        answer_sheet,
        collaborators::{
            GeneratedQuiz, IntentModel, ProfileProvider, QuestionRetriever, QuizGenerator, QuizSpec,
            Responder,
        },
        intent::IntentRouter,
        lifecycle::{GuardDecision, LifecycleGuard},
        quiz_format,
    },
    store::{chat, quizzes, submissions},
};

/// External services the assistant depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub model: Arc<dyn IntentModel>,
    pub generator: Arc<dyn QuizGenerator>,
    pub responder: Arc<dyn Responder>,
    pub profiles: Arc<dyn ProfileProvider>,
    /// Question-bank search for subject questions; answers go without it when unset.
    pub retriever: Option<Arc<dyn QuestionRetriever>>,
}

/// Handles one student message end to end: classify, consult the lifecycle
/// guard, dispatch, and record both sides of the exchange.
#[derive(Clone)]
pub struct Assistant {
    pool: SqlitePool,
    router: IntentRouter,
    guard: LifecycleGuard,
    collaborators: Collaborators,
}

impl Assistant {
    pub fn new(pool: SqlitePool, collaborators: Collaborators) -> Self {
        Self {
            router: IntentRouter::new(collaborators.model.clone()),
            guard: LifecycleGuard::new(pool.clone(), collaborators.model.clone()),
            pool,
            collaborators,
        }
    }

    pub async fn handle_message(
        &self,
        student_id: &str,
        message: &str,
    ) -> Result<ChatReply, AppError> {
        let history = chat::history(&self.pool, student_id, CHAT_HISTORY_WINDOW).await?;

        let intent = self.router.classify(message).await;
        let label = intent.label();
        tracing::info!("Message from {} classified as {:?}", student_id, label);

        chat::record(&self.pool, student_id, ChatRole::User, message, Some(label)).await?;

        let outcome = self.dispatch(student_id, message, &intent, &history).await;

        let reply_text = match &outcome {
            Ok(reply) => reply.reply.clone(),
            Err(e) => e.user_message(),
        };
        chat::record(&self.pool, student_id, ChatRole::Assistant, &reply_text, Some(label)).await?;

        outcome
    }

    async fn dispatch(
        &self,
        student_id: &str,
        message: &str,
        intent: &Intent,
        history: &[ChatMessage],
    ) -> Result<ChatReply, AppError> {
        match self.guard.evaluate(student_id, intent, message).await? {
            GuardDecision::NothingToSubmit => Err(AppError::BadRequest(
                "You have no pending quiz to submit. Ask for a new quiz first.".to_string(),
            )),
            GuardDecision::BlockCreation { pending_quiz_id } => Err(AppError::PendingQuiz {
                quiz_id: pending_quiz_id,
            }),
            GuardDecision::BlockLeakage { pending_quiz_id, .. } => Ok(ChatReply {
                intent: intent.label(),
                reply: format!(
                    "Please finish quiz {} first. Submit your answers (1-A, 2-B, ..., 10-D) and then ask again.",
                    pending_quiz_id
                ),
                blocked: true,
                quiz_id: Some(pending_quiz_id),
                submission: None,
            }),
            GuardDecision::Grade { quiz, sheet } => self.grade(student_id, quiz, sheet).await,
            GuardDecision::Proceed { pending } => match intent {
                Intent::CreateQuiz => self.create_quiz(student_id, message).await,
                Intent::SubmitQuiz(_) => Err(AppError::InvariantViolation(
                    "submission was not routed to grading".to_string(),
                )),
                _ => self.answer(message, intent, history, pending.as_ref()).await,
            },
        }
    }

    async fn grade(
        &self,
        student_id: &str,
        quiz: Quiz,
        sheet: AnswerSheet,
    ) -> Result<ChatReply, AppError> {
        let answers = answer_sheet::ensure_complete(&sheet)?;

        if !is_complete_key(&quiz.answer_key) {
            return Err(AppError::InvariantViolation(format!(
                "Quiz {} has no complete answer key",
                quiz.id
            )));
        }

        let result =
            submissions::submit(&self.pool, &quiz.id, student_id, answers, &quiz.answer_key).await?;
        let details =
            submissions::get_with_details(&self.pool, &result.submission_id, &quiz.answer_key)
                .await?;

        Ok(ChatReply {
            intent: IntentLabel::SubmitQuiz,
            reply: grading_report(&quiz, &details),
            blocked: false,
            quiz_id: Some(quiz.id),
            submission: Some(details),
        })
    }

    async fn create_quiz(&self, student_id: &str, message: &str) -> Result<ChatReply, AppError> {
        let request = match self.collaborators.model.extract_quiz_request(message).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(rephrase_reply()),
            Err(e) => {
                tracing::warn!("Quiz request extraction failed: {}", e);
                return Ok(rephrase_reply());
            }
        };

        let Some(requested_subject) = request
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return Ok(ChatReply::text(
                IntentLabel::CreateQuiz,
                format!(
                    "I could not tell which subject you want. Supported subjects: {}. Example: \"Tạo đề Toán về Hàm số bậc hai\".",
                    ALLOWED_QUIZ_SUBJECTS.join(", ")
                ),
            ));
        };

        let Some(subject) = canonical_subject(requested_subject) else {
            return Ok(ChatReply::text(
                IntentLabel::CreateQuiz,
                format!(
                    "Quizzes are only available for {}. \"{}\" is not supported yet.",
                    ALLOWED_QUIZ_SUBJECTS.join(", "),
                    requested_subject
                ),
            ));
        };

        let Some(topic) = request
            .topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return Ok(rephrase_reply());
        };

        if let Some(n) = request.num_questions.filter(|n| *n != QUIZ_QUESTION_COUNT) {
            tracing::debug!("Requested {} questions, quizzes always have {}", n, QUIZ_QUESTION_COUNT);
        }

        let profile = match self.collaborators.profiles.get(student_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile lookup failed for {}: {}", student_id, e);
                None
            }
        };
        let student = StudentInfo::from_profile(profile.as_ref());

        let difficulty = match request.user_difficulty.as_deref() {
            Some(explicit) => difficulty_label(explicit).to_string(),
            None => student.difficulty.clone(),
        };

        let generated = self
            .generate_validated(QuizSpec {
                subject: subject.to_string(),
                topic: topic.to_string(),
                difficulty: difficulty.clone(),
                student,
                format_reminder: false,
            })
            .await?;

        let answer_key = generated
            .answer_key
            .filter(is_complete_key)
            .ok_or_else(|| {
                AppError::UpstreamFailure(
                    "Quiz generator returned no complete answer key".to_string(),
                )
            })?;

        let quiz_id = quizzes::create(
            &self.pool,
            &NewQuiz {
                student_id: student_id.to_string(),
                content: generated.quiz_markdown.clone(),
                answer_key,
                subject: Some(subject.to_string()),
                topic: Some(topic.to_string()),
                difficulty: Some(difficulty),
            },
        )
        .await?;

        Ok(ChatReply {
            intent: IntentLabel::CreateQuiz,
            reply: format!(
                "Quiz {} is ready.\n\n{}\n\n---\nWhen you are done, send your answers as: 1-A, 2-B, ..., 10-D",
                quiz_id, generated.quiz_markdown
            ),
            blocked: false,
            quiz_id: Some(quiz_id),
            submission: None,
        })
    }

    /// Generates a quiz, retrying once with a format reminder when the body
    /// does not have the expected shape.
    async fn generate_validated(&self, mut spec: QuizSpec) -> Result<GeneratedQuiz, AppError> {
        let first = self.collaborators.generator.generate(&spec).await?;
        match quiz_format::validate(&first.quiz_markdown) {
            Ok(()) => return Ok(first),
            Err(reason) => tracing::warn!("Generated quiz rejected ({}), retrying", reason),
        }

        spec.format_reminder = true;
        let second = self.collaborators.generator.generate(&spec).await?;
        quiz_format::validate(&second.quiz_markdown).map_err(|reason| {
            AppError::UpstreamFailure(format!("Generated quiz is malformed: {}", reason))
        })?;
        Ok(second)
    }

    async fn answer(
        &self,
        message: &str,
        intent: &Intent,
        history: &[ChatMessage],
        pending: Option<&Quiz>,
    ) -> Result<ChatReply, AppError> {
        let related = self.related_questions(message, intent).await;

        let mut reply = self
            .collaborators
            .responder
            .answer(message, intent, history, &related)
            .await?;

        if let Some(quiz) = pending {
            reply.push_str(&format!(
                "\n\n(Reminder: quiz {} is still waiting for your answers.)",
                quiz.id
            ));
        }

        Ok(ChatReply {
            intent: intent.label(),
            reply,
            blocked: false,
            quiz_id: pending.map(|q| q.id.clone()),
            submission: None,
        })
    }

    /// Similar questions from the bank, only for subject questions. Search
    /// failures degrade to an answer without references.
    async fn related_questions(&self, message: &str, intent: &Intent) -> Vec<RetrievedQuestion> {
        let (Intent::AskQuestion { subject }, Some(retriever)) =
            (intent, self.collaborators.retriever.as_ref())
        else {
            return Vec::new();
        };

        match retriever.search(message, subject.as_deref(), RETRIEVAL_TOP_K).await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!("Question search failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn canonical_subject(subject: &str) -> Option<&'static str> {
    let lower = subject.to_lowercase();
    ALLOWED_QUIZ_SUBJECTS
        .iter()
        .find(|allowed| allowed.to_lowercase() == lower)
        .copied()
}

fn rephrase_reply() -> ChatReply {
    ChatReply::text(
        IntentLabel::CreateQuiz,
        format!(
            "Sorry, I did not understand the quiz request. Supported subjects: {}. Try: \"Tạo đề Vật lý về Động lực học\".",
            ALLOWED_QUIZ_SUBJECTS.join(", ")
        ),
    )
}

fn grading_report(quiz: &Quiz, details: &SubmissionDetails) -> String {
    let mut report = format!(
        "Submission {} for quiz {}: {}/{} correct.\n",
        details.submission.id, quiz.id, details.correct_count, details.total
    );
    for line in &details.details {
        let mark = if line.is_correct { "✓" } else { "✗" };
        report.push_str(&format!(
            "\n{} Question {}: your answer {}, correct answer {}",
            mark, line.question_number, line.student_answer, line.correct_answer
        ));
    }
    report
}
