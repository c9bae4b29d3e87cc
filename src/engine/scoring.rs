// src/engine/scoring.rs

use serde::Serialize;
use utoipa::ToSchema;

/// Strict string match against the answer key. No answer (timeout) never scores.
pub fn is_correct(selected: Option<&str>, correct_answer: &str) -> bool {
    selected == Some(correct_answer)
}

/// Treats an empty selection like no selection at all.
pub fn normalize_selection(selected: Option<String>) -> Option<String> {
    selected.filter(|s| !s.is_empty())
}

/// Change to apply to a session's running correct count when an answer for a
/// question is recorded. `previous` is the stored correctness of an earlier
/// answer to the same question in the same session, if any.
pub fn correct_count_delta(previous: Option<bool>, now_correct: bool) -> i32 {
    match (previous, now_correct) {
        (Some(true), false) => -1,
        (Some(false), true) | (None, true) => 1,
        _ => 0,
    }
}

/// Integer percentage, rounded half up. An empty session scores 0.
pub fn score_percentage(correct_count: i32, total_questions: i32) -> i32 {
    if total_questions <= 0 {
        return 0;
    }
    (f64::from(correct_count) / f64::from(total_questions) * 100.0).round() as i32
}

/// Aggregate time spent over the answers that recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct TimingSummary {
    pub total_time_taken: i64,
    pub avg_time_per_question: i64,
}

impl TimingSummary {
    pub fn from_times<I>(times: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (total, count) = times
            .into_iter()
            .fold((0i64, 0i64), |(sum, n), t| (sum + i64::from(t), n + 1));

        if count == 0 {
            return Self::default();
        }

        Self {
            total_time_taken: total,
            avg_time_per_question: (total as f64 / count as f64).round() as i64,
        }
    }
}
