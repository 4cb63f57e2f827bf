// src/services/grader.rs

use crate::{
    config::QUIZ_QUESTION_COUNT,
    models::{quiz::Answers, submission::QuestionResult},
};

/// Marker used for an answer that is not there.
const MISSING: &str = "?";

fn is_match(student: Option<&char>, correct: Option<&char>) -> bool {
    match (student, correct) {
        (Some(s), Some(c)) => s.eq_ignore_ascii_case(c),
        _ => false,
    }
}

/// Counts correct answers over questions 1..=10, one point each.
///
/// Letters compare case-insensitively. A question missing from either side
/// never matches, so an empty sheet scores 0 against any key.
pub fn grade(student_answers: &Answers, answer_key: &Answers) -> u32 {
    (1..=QUIZ_QUESTION_COUNT)
        .filter(|n| is_match(student_answers.get(n), answer_key.get(n)))
        .count() as u32
}

/// Per-question view of a graded sheet.
pub fn breakdown(student_answers: &Answers, answer_key: &Answers) -> Vec<QuestionResult> {
    (1..=QUIZ_QUESTION_COUNT)
        .map(|n| {
            let student = student_answers.get(&n);
            let correct = answer_key.get(&n);
            QuestionResult {
                question_number: n,
                correct_answer: correct
                    .map(|c| c.to_ascii_uppercase().to_string())
                    .unwrap_or_else(|| MISSING.to_string()),
                student_answer: student
                    .map(|c| c.to_ascii_uppercase().to_string())
                    .unwrap_or_else(|| MISSING.to_string()),
                is_correct: is_match(student, correct),
            }
        })
        .collect()
}

/// Score as a percentage of the full quiz.
pub fn percentage(score: u32) -> f64 {
    score as f64 / QUIZ_QUESTION_COUNT as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Answers {
        "ABCDABCDAB"
            .chars()
            .enumerate()
            .map(|(i, c)| (i as u32 + 1, c))
            .collect()
    }

    #[test]
    fn test_grade_perfect() {
        assert_eq!(grade(&key(), &key()), 10);
    }

    #[test]
    fn test_grade_empty_sheet() {
        assert_eq!(grade(&Answers::new(), &key()), 0);
    }

    #[test]
    fn test_grade_missing_key_entry_never_matches() {
        let mut k = key();
        k.remove(&4);
        let mut sheet = key();
        sheet.remove(&4);
        assert_eq!(grade(&sheet, &k), 9);
    }

    #[test]
    fn test_flipping_a_correct_answer_costs_one_point() {
        for n in 1..=10 {
            let mut sheet = key();
            let current = sheet[&n];
            let wrong = if current == 'A' { 'B' } else { 'A' };
            sheet.insert(n, wrong);
            assert_eq!(grade(&sheet, &key()), 9, "question {}", n);
        }
    }

    #[test]
    fn test_grade_is_case_insensitive() {
        let lower: Answers = key()
            .into_iter()
            .map(|(n, c)| (n, c.to_ascii_lowercase()))
            .collect();
        assert_eq!(grade(&lower, &key()), 10);
    }

    #[test]
    fn test_out_of_range_questions_are_ignored() {
        let mut sheet = key();
        sheet.insert(11, 'A');
        sheet.insert(0, 'B');
        assert_eq!(grade(&sheet, &key()), 10);
    }

    #[test]
    fn test_breakdown_marks_missing_answers() {
        let mut sheet = key();
        sheet.remove(&2);
        sheet.insert(10, 'C');

        let details = breakdown(&sheet, &key());
        assert_eq!(details.len(), 10);
        assert_eq!(details[1].student_answer, "?");
        assert!(!details[1].is_correct);
        assert_eq!(details[9].correct_answer, "B");
        assert_eq!(details[9].student_answer, "C");
        assert!(!details[9].is_correct);
        assert_eq!(details.iter().filter(|d| d.is_correct).count(), 8);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(9), 90.0);
        assert_eq!(percentage(0), 0.0);
    }
}
