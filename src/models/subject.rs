// src/models/subject.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::question::Question;

/// Represents the 'subjects' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subject card shown to learners, with the caller's own progress.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectOverview {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub question_count: i64,
    pub module_count: i64,
    /// Distinct questions the caller has a statistics row for.
    pub attempted: i64,
    /// Distinct questions the caller answered correctly at least once.
    pub mastered: i64,
}

/// Per-subject progress of one user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubjectStats {
    pub total_questions: i64,
    pub total_attempted: i64,
    pub correctly_attempted: i64,
    pub total_answers: i64,
    pub quizzes_completed: i64,
}

/// One entry of an uploaded question bank. Every field is optional so that
/// incomplete entries can be counted as skipped instead of failing the upload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadQuestion {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub module: Option<String>,
}

/// A complete upload entry, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub module: String,
}

impl UploadQuestion {
    /// Returns the entry as an insertable question, or `None` when a required
    /// field is missing/blank or the correct answer is not among the options.
    pub fn into_new_question(self) -> Option<NewQuestion> {
        let question = self.question.filter(|q| !q.trim().is_empty())?;
        let options = self.options.filter(|o| !o.is_empty())?;
        let correct_answer = self.correct_answer.filter(|a| !a.is_empty())?;
        let module = self.module.filter(|m| !m.trim().is_empty())?;

        if !options.contains(&correct_answer) {
            return None;
        }

        Some(NewQuestion {
            question,
            options,
            correct_answer,
            explanation: self.explanation.filter(|e| !e.is_empty()),
            module,
        })
    }
}

/// DTO for uploading a question bank.
///
/// `merge` decides what happens when the subject name already exists:
/// absent asks the client to choose, `true` adds to it, `false` skips.
#[derive(Debug, Deserialize, Validate)]
pub struct UploadSubjectRequest {
    #[validate(length(min = 1, max = 255, message = "Subject name is required."))]
    pub subject: String,
    pub questions: Vec<UploadQuestion>,
    pub merge: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub message: String,
    pub subject_id: i64,
    pub inserted: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub total: u64,
}

/// Question bank in the same shape the upload endpoint accepts.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectExport {
    pub subject: String,
    pub questions: Vec<ExportedQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub module: String,
}

impl From<Question> for ExportedQuestion {
    fn from(q: Question) -> Self {
        Self {
            question: q.question,
            options: q.options.0,
            correct_answer: q.correct_answer,
            explanation: q.explanation,
            module: q.module,
        }
    }
}

/// Dashboard counters for admins.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub pending_users: i64,
    pub banned_users: i64,
    pub total_subjects: i64,
    pub total_questions: i64,
    pub total_quizzes: i64,
}
