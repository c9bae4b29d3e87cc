// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use utoipa::ToSchema;

use crate::engine::selection::{Ranked, Tier};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub subject_id: i64,

    /// The text content of the question. Unique within a subject.
    pub question: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Must be one of `options`.
    pub correct_answer: String,

    pub explanation: Option<String>,

    /// Grouping label inside the subject.
    pub module: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to the client during a quiz.
/// Excludes `correct_answer` and `explanation`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub module: String,
}

/// A question eligible for a new session, joined with the caller's
/// statistics row (both counters are NULL when the user never saw it).
#[derive(Debug, Clone, FromRow)]
pub struct QuestionCandidate {
    pub id: i64,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub module: String,
    pub times_attempted: Option<i32>,
    pub times_correct: Option<i32>,
}

impl Ranked for QuestionCandidate {
    fn tier(&self) -> Tier {
        Tier::of(self.times_attempted.zip(self.times_correct))
    }
}

impl From<QuestionCandidate> for PublicQuestion {
    fn from(candidate: QuestionCandidate) -> Self {
        Self {
            id: candidate.id,
            question: candidate.question,
            options: candidate.options.0,
            module: candidate.module,
        }
    }
}

/// Answer key for a single question, read while scoring a submission.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerKey {
    pub correct_answer: String,
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(stat: Option<(i32, i32)>) -> QuestionCandidate {
        QuestionCandidate {
            id: 9,
            question: "2 + 2?".into(),
            options: Json(vec!["3".into(), "4".into()]),
            module: "Arithmetic".into(),
            times_attempted: stat.map(|s| s.0),
            times_correct: stat.map(|s| s.1),
        }
    }

    #[test]
    fn test_candidate_tier_follows_stats() {
        assert_eq!(candidate(None).tier(), Tier::Unseen);
        assert_eq!(candidate(Some((2, 0))).tier(), Tier::NeverCorrect);
        assert_eq!(candidate(Some((2, 1))).tier(), Tier::Seen);
    }

    #[test]
    fn test_public_question_hides_answer_key() {
        let public = PublicQuestion::from(candidate(None));
        let value = serde_json::to_value(&public).unwrap();
        let object = value.as_object().unwrap();

        assert!(object.contains_key("options"));
        assert!(object.contains_key("module"));
        assert!(!object.contains_key("correct_answer"));
        assert!(!object.contains_key("explanation"));
    }
}
