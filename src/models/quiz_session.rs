// src/models/quiz_session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{question::PublicQuestion, quiz_answer::ReviewAnswer};
use crate::config::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::engine::TimingConfig;
use crate::error::AppError;

/// Represents the 'quiz_sessions' table in the database.
/// A session is active while `completed_at` is NULL.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizSession {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: i64,
    pub total_questions: i32,
    pub is_timed: bool,
    /// 'per_question', 'block' or NULL for untimed sessions.
    pub timer_mode: Option<String>,
    pub time_per_question: Option<i32>,
    pub total_time: Option<i32>,
    pub show_feedback: bool,
    pub correct_count: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    pub fn timing(&self) -> TimingConfig {
        TimingConfig::from_columns(
            self.timer_mode.as_deref(),
            self.time_per_question,
            self.total_time,
        )
    }

    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// DTO for starting a regular quiz.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartQuizRequest {
    pub subject_id: i64,
    /// Clamped to [10, 100] and to the number of questions in the subject.
    #[validate(range(min = 1, message = "question_count must be a positive number"))]
    pub question_count: i64,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Defaults to true.
    pub show_feedback: Option<bool>,
}

/// DTO for starting a quiz made of the caller's net-wrong questions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartWrongQuizRequest {
    pub subject_id: i64,
    #[serde(default)]
    pub timing: TimingConfig,
    pub show_feedback: Option<bool>,
}

/// Returned by both start endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStarted {
    pub session_id: i64,
    pub subject_id: i64,
    pub total_questions: i32,
    pub timing: TimingConfig,
    pub show_feedback: bool,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for answering (or re-answering) one question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAnswerRequest {
    pub session_id: i64,
    pub question_id: i64,
    /// NULL or empty when the timer ran out before an answer was picked.
    pub selected_answer: Option<String>,
    /// Seconds spent on the question, as measured by the client.
    #[validate(range(min = 0, message = "time_taken cannot be negative"))]
    pub time_taken: Option<i32>,
    /// Overrides the session's feedback setting for this answer.
    pub show_feedback: Option<bool>,
}

/// Result of a submission: a bare acknowledgement, or the answer key when
/// feedback is on.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SubmitOutcome {
    Feedback {
        is_correct: bool,
        correct_answer: String,
        explanation: Option<String>,
    },
    Saved {
        saved: bool,
    },
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteQuizRequest {
    pub session_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionResult {
    pub session_id: i64,
    pub total_questions: i32,
    pub correct_count: i32,
    /// Rounded percentage.
    pub score: i32,
    pub completed_at: DateTime<Utc>,
    pub total_time_taken: i64,
    pub avg_time_per_question: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub session: QuizSession,
    pub timing: TimingConfig,
    pub answers: Vec<ReviewAnswer>,
    pub total_time_taken: i64,
    pub avg_time_per_question: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WrongCount {
    pub count: i64,
}

/// One row of the caller's quiz history.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: i64,
    pub subject_id: i64,
    pub subject_name: String,
    pub total_questions: i32,
    pub correct_count: i32,
    pub is_timed: bool,
    pub timer_mode: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl HistoryQuery {
    /// Page is at least 1; limit falls back to the default and is kept
    /// within `1..=MAX_HISTORY_LIMIT`.
    pub fn resolve(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        (page, limit)
    }

    /// Rows to skip before the resolved page.
    pub fn offset(&self) -> Result<i64, AppError> {
        let (page, limit) = self.resolve();
        (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::BadRequest("Page is out of range".to_string()))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub sessions: Vec<HistoryEntry>,
    pub pagination: Pagination,
}
