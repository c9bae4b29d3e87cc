use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};
use utoipa::ToSchema;

/// A recorded answer joined with its question, used by the review screen.
/// Unlike `PublicQuestion`, this exposes the answer key.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ReviewAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub selected_answer: Option<String>,
    pub is_correct: bool,
    pub time_taken: Option<i32>,
    pub answered_at: DateTime<Utc>,
    pub question: String,
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub module: String,
}
