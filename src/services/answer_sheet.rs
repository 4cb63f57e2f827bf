// src/services/answer_sheet.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    config::QUIZ_QUESTION_COUNT,
    error::AppError,
    models::{intent::AnswerSheet, quiz::Answers},
};

/// `1-A`, `2.b`, `3: C`, `4) d`, `5 A`. The letter must end the word so
/// "10 câu" is not read as an answer.
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,2})\s*[-.:)=]?\s*([a-d])\b").expect("valid answer pair regex")
});

/// Extracts every `number-letter` pair from free text.
pub fn parse(text: &str) -> AnswerSheet {
    let mut answers = Answers::new();
    let mut pair_count = 0;

    for caps in PAIR_RE.captures_iter(text) {
        pair_count += 1;
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        if !(1..=QUIZ_QUESTION_COUNT).contains(&number) {
            continue;
        }
        if let Some(letter) = caps[2].chars().next() {
            answers.entry(number).or_insert(letter.to_ascii_uppercase());
        }
    }

    AnswerSheet { answers, pair_count }
}

/// Parses an answer key given as text (`"1-A,2-B,..."`).
pub fn parse_key(text: &str) -> Answers {
    parse(text).answers
}

/// Rejects a sheet that does not answer every question.
pub fn ensure_complete(sheet: &AnswerSheet) -> Result<&Answers, AppError> {
    let answered = sheet.answers.len();
    if answered < QUIZ_QUESTION_COUNT as usize {
        let missing: Vec<String> = (1..=QUIZ_QUESTION_COUNT)
            .filter(|n| !sheet.answers.contains_key(n))
            .map(|n| n.to_string())
            .collect();
        return Err(AppError::BadRequest(format!(
            "Found {} of {} answers (missing: {}). Send all answers as: 1-A, 2-B, 3-C, ..., 10-D",
            answered,
            QUIZ_QUESTION_COUNT,
            missing.join(", ")
        )));
    }
    Ok(&sheet.answers)
}

/// Renders answers back to the `1-A,2-B,...` text form.
pub fn format(answers: &Answers) -> String {
    answers
        .iter()
        .map(|(n, c)| format!("{}-{}", n, c))
        .collect::<Vec<_>>()
        .join(",")
}
