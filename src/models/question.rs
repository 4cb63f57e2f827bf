// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An exam question from the indexed question bank, returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedQuestion {
    #[serde(rename = "id")]
    pub question_id: String,
    pub question: String,
    /// Option letter to option text.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub correct_answer_text: String,
    #[serde(default)]
    pub subject: String,
    /// Page of the source document the question was extracted from.
    #[serde(default)]
    pub primary_page: Option<serde_json::Value>,
    /// Similarity to the query; filled in from the search hit.
    #[serde(default)]
    pub score: f64,
}

impl RetrievedQuestion {
    /// Plain-text block handed to the responder, with the correct option marked.
    pub fn to_prompt_block(&self, index: usize) -> String {
        let mut block = format!(
            "--- Câu hỏi {} (độ tương đồng: {:.2}) ---\nID: {}\nMôn: {}\nCâu hỏi: {}\nCác lựa chọn:\n",
            index, self.score, self.question_id, self.subject, self.question
        );
        for (letter, text) in &self.options {
            let marker = if *letter == self.correct_answer { "✓" } else { " " };
            block.push_str(&format!("  [{}] {}. {}\n", marker, letter, text));
        }
        block.push_str(&format!(
            "Đáp án đúng: {} - {}\n",
            self.correct_answer, self.correct_answer_text
        ));
        block
    }
}
