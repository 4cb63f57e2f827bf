// src/services/llm.rs

//! OpenAI-compatible client backing the intent model, the quiz generator,
//! the responder and the question-search embeddings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value as JsonValue, json};

use crate::{
    config::{ALLOWED_QUIZ_SUBJECTS, Config},
    error::AppError,
    models::{
        chat::{ChatMessage, ChatRole},
        intent::{Intent, LeakageVerdict, ModelIntent, QuizRequest},
        question::RetrievedQuestion,
        quiz::{Answers, Quiz},
    },
    services::{
        answer_sheet,
        collaborators::{GeneratedQuiz, IntentModel, QuizGenerator, QuizSpec, Responder},
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const CLASSIFY_PROMPT: &str = r#"Bạn là trợ lý phân loại tin nhắn của học sinh THPT.
Trả về JSON:
{
    "intent": "ask_question" | "create_quiz" | "submit_quiz" | "draw_graph" | "chat",
    "subject": "Toán" | "Vật lý" | "Hóa học" | "Sinh học" | null,
    "confidence": 0.0-1.0
}
"ask_question" chỉ dùng cho câu hỏi về môn tự nhiên (Toán, Lý, Hóa, Sinh).
Chỉ trả về JSON."#;

const EXTRACT_PROMPT: &str = r#"Trích xuất yêu cầu tạo đề từ tin nhắn của học sinh.
Trả về JSON:
{
    "subject": "Toán" | "Vật lý" | "Hóa học" | "Sinh học" | null,
    "topic": "chủ đề CỤ THỂ",
    "num_questions": 10,
    "user_difficulty": "dễ" | "trung bình" | "khó" | null
}
- Môn khác (Văn, Anh, Sử, Địa, ...) thì giữ nguyên tên môn đó trong "subject".
- Không xác định được môn thì "subject" = null.
- Chủ đề chung chung thì cụ thể hóa (VD: "Động lực học" -> "Ba định luật Newton").
- Chỉ đặt "user_difficulty" khi học sinh NÓI RÕ độ khó.
Chỉ trả về JSON."#;

const LEAKAGE_PROMPT: &str = r#"Học sinh đang làm một đề kiểm tra chưa nộp (nội dung bên dưới).
Xác định tin nhắn mới có đang hỏi đáp án, lời giải, hoặc gợi ý cho câu nào trong đề không,
kể cả khi diễn đạt lại câu hỏi.
Trả về JSON: {"is_blocked": true|false, "reason": "lý do ngắn gọn"}
Chỉ trả về JSON."#;

const GENERATE_PROMPT: &str = r#"Chuyên gia ra đề trắc nghiệm THPT. Tạo đề 15 phút, đúng 10 câu, mỗi câu 4 đáp án.

QUY TẮC:
1. BẮT BUỘC: Đúng 10 câu (Câu 1 -> 10)
2. Câu hỏi chính xác khoa học, đáp án nhiễu hợp lý
3. "quiz_markdown" CHỈ CÓ ĐỀ, KHÔNG CÓ ĐÁP ÁN
4. "answer_key" là đáp án đúng của từng câu

FORMAT quiz_markdown:
# ĐỀ KIỂM TRA 15 PHÚT - [MÔN]
**Chủ đề**: [topic]
**Độ khó**: [level]
**Thời gian**: 15 phút
**Họ và tên**: [name]
**Lớp**: [class]
---
## **Câu 1**: [question]
**A.** [option]
**B.** [option]
**C.** [option]
**D.** [option]
...
---
_Hết_

Trả về JSON: {"quiz_markdown": "...", "answer_key": {"1": "A", "2": "C", ..., "10": "B"}}"#;

const FORMAT_REMINDER: &str =
    "CHÚ Ý: Đúng format ## **Câu X**: và **A.**, **B.**, **C.**, **D.**, không ghi đáp án trong đề.";

const ANSWER_PROMPT: &str = "Bạn là trợ lý giáo dục thân thiện cho học sinh THPT. \
     Giải thích rõ ràng, dễ hiểu, khuyến khích học sinh tư duy.";

const RELATED_PROMPT: &str = "Các câu hỏi liên quan trong ngân hàng đề được liệt kê bên dưới. \
     Dựa vào chúng để trả lời và ghi rõ ID câu hỏi đã tham khảo.";

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            embedding_model: "text-embedding-3-large".to_string(),
        }
    }

    pub fn with_embedding_model(mut self, model: String) -> Self {
        self.embedding_model = model;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            Client::new(),
        )
        .with_embedding_model(config.embedding_model.clone())
    }

    /// Embeds one text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let payload = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let res = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!(
                "Embedding request failed {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;
        parse_embedding(&body)
    }

    /// Sends a chat completion and returns the first choice's text.
    async fn chat(
        &self,
        messages: Vec<JsonValue>,
        temperature: f64,
        json_mode: bool,
    ) -> Result<String, AppError> {
        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });
        if json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!(
                "Chat completion failed {}: {}",
                status, text
            )));
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AppError::UpstreamFailure("Invalid chat completion format".to_string()))
    }

    async fn chat_json(
        &self,
        system: &str,
        user: String,
        temperature: f64,
    ) -> Result<JsonValue, AppError> {
        let content = self
            .chat(
                vec![
                    json!({"role": "system", "content": system}),
                    json!({"role": "user", "content": user}),
                ],
                temperature,
                true,
            )
            .await?;
        parse_json_content(&content)
    }
}

/// Reads the first vector out of an embeddings response.
pub fn parse_embedding(body: &JsonValue) -> Result<Vec<f32>, AppError> {
    let vector: Vec<f32> = body
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("embedding"))
        .and_then(|e| e.as_array())
        .map(|values| values.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
        .unwrap_or_default();

    if vector.is_empty() {
        return Err(AppError::UpstreamFailure("Invalid embedding response".to_string()));
    }
    Ok(vector)
}

/// Parses model output as JSON, tolerating a surrounding markdown fence.
pub fn parse_json_content(content: &str) -> Result<JsonValue, AppError> {
    let trimmed = content.trim();
    let body = if let Some(rest) = trimmed.split("```json").nth(1) {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some(rest) = trimmed.split("```").nth(1) {
        rest
    } else {
        trimmed
    };

    serde_json::from_str(body.trim())
        .map_err(|e| AppError::UpstreamFailure(format!("Model returned invalid JSON: {}", e)))
}

/// Reads an answer key given either as `{"1": "A", ...}` or `"1-A,2-B,..."`.
/// Entries that are not a single A-D letter are dropped.
pub fn parse_answer_key(value: &JsonValue) -> Option<Answers> {
    let answers: Answers = match value {
        JsonValue::Object(map) => map
            .iter()
            .filter_map(|(k, v)| {
                let number = k.trim().parse::<u32>().ok()?;
                let letter = v.as_str()?.trim().to_ascii_uppercase();
                let mut chars = letter.chars();
                match (chars.next(), chars.next()) {
                    (Some(c @ 'A'..='D'), None) => Some((number, c)),
                    _ => None,
                }
            })
            .collect(),
        JsonValue::String(text) => answer_sheet::parse_key(text),
        _ => return None,
    };

    if answers.is_empty() { None } else { Some(answers) }
}

#[async_trait]
impl IntentModel for OpenAiClient {
    async fn classify(&self, message: &str) -> Result<ModelIntent, AppError> {
        let value = self.chat_json(CLASSIFY_PROMPT, message.to_string(), 0.0).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::UpstreamFailure(format!("Unexpected classification: {}", e)))
    }

    async fn extract_quiz_request(&self, message: &str) -> Result<Option<QuizRequest>, AppError> {
        let value = self
            .chat_json(EXTRACT_PROMPT, format!("Tin nhắn: \"{}\"", message), 0.0)
            .await?;
        let request: QuizRequest = serde_json::from_value(value)
            .map_err(|e| AppError::UpstreamFailure(format!("Unexpected quiz request: {}", e)))?;

        if request.topic.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Ok(None);
        }
        Ok(Some(request))
    }

    async fn check_leakage(&self, message: &str, quiz: &Quiz) -> Result<LeakageVerdict, AppError> {
        let user = format!("ĐỀ ĐANG LÀM:\n{}\n\nTIN NHẮN MỚI:\n{}", quiz.content, message);
        let value = self.chat_json(LEAKAGE_PROMPT, user, 0.0).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::UpstreamFailure(format!("Unexpected leakage verdict: {}", e)))
    }
}

#[async_trait]
impl QuizGenerator for OpenAiClient {
    async fn generate(&self, spec: &QuizSpec) -> Result<GeneratedQuiz, AppError> {
        let mut user = format!(
            "Đề thi:\n- Môn: {} | Chủ đề: {}\n- Học sinh: {} - {}\n- 10 câu, 15 phút, mỗi câu 1 điểm\n- Độ khó: {}",
            spec.subject,
            spec.topic,
            spec.student.full_name,
            spec.student.current_class,
            spec.difficulty
        );
        if spec.difficulty == "khó" {
            user.push_str("\nĐộ khó 'khó': 6-7 câu bài tập nhiều bước, đáp án gần nhau.");
        }
        if spec.format_reminder {
            user.push_str("\n\n");
            user.push_str(FORMAT_REMINDER);
        }

        tracing::info!("Generating quiz: {} - {} ({})", spec.subject, spec.topic, spec.difficulty);
        let value = self.chat_json(GENERATE_PROMPT, user, 0.7).await?;

        let quiz_markdown = value
            .get("quiz_markdown")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AppError::UpstreamFailure("Generator returned no quiz body".to_string()))?;

        Ok(GeneratedQuiz {
            quiz_markdown,
            answer_key: value.get("answer_key").and_then(parse_answer_key),
        })
    }
}

#[async_trait]
impl Responder for OpenAiClient {
    async fn answer(
        &self,
        message: &str,
        intent: &Intent,
        history: &[ChatMessage],
        related: &[RetrievedQuestion],
    ) -> Result<String, AppError> {
        let mut system = match intent {
            Intent::AskQuestion {
                subject: Some(subject),
            } => format!(
                "{} Câu hỏi thuộc môn {}. Trả lời chính xác, có giải thích từng bước.",
                ANSWER_PROMPT, subject
            ),
            Intent::DrawGraph => format!(
                "{} Học sinh muốn vẽ đồ thị: mô tả hình dạng đồ thị, các điểm đặc biệt và cách vẽ.",
                ANSWER_PROMPT
            ),
            _ => format!(
                "{} Trả lời ngắn gọn. Hệ thống hỗ trợ tạo đề cho các môn: {}.",
                ANSWER_PROMPT,
                ALLOWED_QUIZ_SUBJECTS.join(", ")
            ),
        };

        if !related.is_empty() {
            system.push_str("\n\n");
            system.push_str(RELATED_PROMPT);
            for (i, question) in related.iter().enumerate() {
                system.push_str("\n\n");
                system.push_str(&question.to_prompt_block(i + 1));
            }
        }

        let mut messages = vec![json!({"role": "system", "content": system})];
        for past in history {
            let role = match past.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": past.content}));
        }
        messages.push(json!({"role": "user", "content": message}));

        self.chat(messages, 0.3, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_content_plain() {
        let value = parse_json_content(r#"{"is_blocked": false, "reason": ""}"#).unwrap();
        assert_eq!(value["is_blocked"], false);
    }

    #[test]
    fn test_parse_json_content_fenced() {
        let content = "Kết quả:\n```json\n{\"subject\": \"Toán\", \"topic\": \"Hàm số\"}\n```";
        let value = parse_json_content(content).unwrap();
        assert_eq!(value["subject"], "Toán");
    }

    #[test]
    fn test_parse_json_content_rejects_garbage() {
        assert!(matches!(
            parse_json_content("not json"),
            Err(AppError::UpstreamFailure(_))
        ));
    }

    #[test]
    fn test_parse_answer_key_object() {
        let key = parse_answer_key(&json!({"1": "a", "2": "B", "3": "E", "x": "C", "4": "AB"}))
            .unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(key[&1], 'A');
        assert_eq!(key[&2], 'B');
    }

    #[test]
    fn test_parse_answer_key_text() {
        let key = parse_answer_key(&json!("1-A,2-B,3-C")).unwrap();
        assert_eq!(key[&3], 'C');
    }

    #[test]
    fn test_parse_answer_key_missing() {
        assert!(parse_answer_key(&json!(null)).is_none());
        assert!(parse_answer_key(&json!({})).is_none());
    }

    #[test]
    fn test_parse_embedding() {
        let body = json!({"data": [{"index": 0, "embedding": [0.25, -0.5, 1.0]}]});
        assert_eq!(parse_embedding(&body).unwrap(), vec![0.25, -0.5, 1.0]);
        assert!(matches!(
            parse_embedding(&json!({"data": []})),
            Err(AppError::UpstreamFailure(_))
        ));
    }

    #[test]
    fn test_model_intent_deserializes() {
        let intent: ModelIntent =
            serde_json::from_value(json!({"intent": "ask_question", "subject": "Toán", "confidence": 0.9}))
                .unwrap();
        assert_eq!(intent.subject.as_deref(), Some("Toán"));
    }
}
