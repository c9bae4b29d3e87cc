// src/engine/timing.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{MAX_BLOCK_SECONDS, MAX_SECONDS_PER_QUESTION};
use crate::error::AppError;

/// How a quiz session is timed.
///
/// The countdown itself runs on the client. The server only stores and echoes
/// the configuration, so late answers are still accepted and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimingConfig {
    #[default]
    Untimed,
    /// Every question gets its own countdown.
    PerQuestion { seconds: i32 },
    /// One countdown for the whole quiz.
    Block { total_seconds: i32 },
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        match *self {
            TimingConfig::Untimed => Ok(()),
            TimingConfig::PerQuestion { seconds } => {
                if (1..=MAX_SECONDS_PER_QUESTION).contains(&seconds) {
                    Ok(())
                } else {
                    Err(AppError::BadRequest(format!(
                        "Time per question must be between 1 and {} seconds",
                        MAX_SECONDS_PER_QUESTION
                    )))
                }
            }
            TimingConfig::Block { total_seconds } => {
                if (1..=MAX_BLOCK_SECONDS).contains(&total_seconds) {
                    Ok(())
                } else {
                    Err(AppError::BadRequest(format!(
                        "Total time must be between 1 and {} seconds",
                        MAX_BLOCK_SECONDS
                    )))
                }
            }
        }
    }

    pub fn is_timed(&self) -> bool {
        !matches!(self, TimingConfig::Untimed)
    }

    /// Value stored in `quiz_sessions.timer_mode`.
    pub fn mode_label(&self) -> Option<&'static str> {
        match self {
            TimingConfig::Untimed => None,
            TimingConfig::PerQuestion { .. } => Some("per_question"),
            TimingConfig::Block { .. } => Some("block"),
        }
    }

    pub fn time_per_question(&self) -> Option<i32> {
        match *self {
            TimingConfig::PerQuestion { seconds } => Some(seconds),
            _ => None,
        }
    }

    pub fn total_time(&self) -> Option<i32> {
        match *self {
            TimingConfig::Block { total_seconds } => Some(total_seconds),
            _ => None,
        }
    }

    /// Rebuilds the variant from the persisted session columns.
    /// Rows with an unknown mode or a missing duration read back as untimed.
    pub fn from_columns(
        timer_mode: Option<&str>,
        time_per_question: Option<i32>,
        total_time: Option<i32>,
    ) -> Self {
        match (timer_mode, time_per_question, total_time) {
            (Some("per_question"), Some(seconds), _) => TimingConfig::PerQuestion { seconds },
            (Some("block"), _, Some(total_seconds)) => TimingConfig::Block { total_seconds },
            _ => TimingConfig::Untimed,
        }
    }
}
