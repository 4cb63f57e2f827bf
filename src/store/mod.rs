// src/store/mod.rs

//! SQLite-backed persistence. Every function takes the pool and either
//! commits fully or leaves the tables untouched.

pub mod chat;
pub mod quizzes;
pub mod submissions;

use chrono::{Local, NaiveDate};

/// How many consecutive ids to try when another student already took one.
const MAX_ID_ATTEMPTS: i64 = 50;

/// Calendar day used for daily sequences, in server-local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Builds `<prefix>_<YYYYMMDD>_<NNN>`.
pub fn daily_id(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!("{}_{}_{:03}", prefix, date.format("%Y%m%d"), sequence)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_id_format() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(daily_id("quiz", date, 1), "quiz_20250110_001");
        assert_eq!(daily_id("sub", date, 42), "sub_20250110_042");
    }
}
