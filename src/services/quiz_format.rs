// src/services/quiz_format.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{OPTIONS_PER_QUESTION, QUIZ_QUESTION_COUNT};

static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"##\s+\*\*Câu\s+\d+\*\*:").expect("valid question regex"));

static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[A-D]\.\*\*").expect("valid option regex"));

/// Checks a generated quiz body: 10 `## **Câu N**:` headings, 4 bold options
/// each, and no answer section.
pub fn validate(markdown: &str) -> Result<(), String> {
    let questions = QUESTION_RE.find_iter(markdown).count();
    if questions != QUIZ_QUESTION_COUNT as usize {
        return Err(format!(
            "expected {} questions, found {}",
            QUIZ_QUESTION_COUNT, questions
        ));
    }

    let expected_options = QUIZ_QUESTION_COUNT as usize * OPTIONS_PER_QUESTION;
    let options = OPTION_RE.find_iter(markdown).count();
    if options != expected_options {
        return Err(format!(
            "expected {} options, found {}",
            expected_options, options
        ));
    }

    if markdown.to_uppercase().contains("ĐÁP ÁN") {
        return Err("quiz body contains an answer section".to_string());
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_markdown() -> String {
    let mut md = String::from("# ĐỀ KIỂM TRA 15 PHÚT - VẬT LÝ\n**Chủ đề**: Lực\n---\n");
    for n in 1..=QUIZ_QUESTION_COUNT {
        md.push_str(&format!(
            "## **Câu {}**: Câu hỏi số {}?\n**A.** 1  \n**B.** 2  \n**C.** 3  \n**D.** 4\n",
            n, n
        ));
    }
    md.push_str("---\n_Hết_");
    md
}
