// src/handlers/user.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        subject::SubjectStats,
        user::{CurrentUser, Theme, ThemeRequest, UserProfile},
    },
};

/// Returns the caller's own account.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, username, name, role, approved, banned, theme_preference, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}

pub async fn update_theme(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let theme: Theme = payload.theme.parse()?;

    sqlx::query("UPDATE users SET theme_preference = $1 WHERE id = $2")
        .bind(theme.as_str())
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Theme updated", "theme": theme.as_str() })))
}

/// Progress of the caller in one subject.
///
/// `quizzes_completed` only counts finished sessions.
pub async fn subject_stats(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, SubjectStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM questions WHERE subject_id = $2) AS total_questions,
            COUNT(uqs.question_id) AS total_attempted,
            COUNT(uqs.question_id) FILTER (WHERE uqs.times_correct > 0) AS correctly_attempted,
            COALESCE(SUM(uqs.times_attempted), 0)::BIGINT AS total_answers,
            (SELECT COUNT(*) FROM quiz_sessions
             WHERE user_id = $1 AND subject_id = $2 AND completed_at IS NOT NULL) AS quizzes_completed
        FROM user_question_stats uqs
        JOIN questions q ON q.id = uqs.question_id
        WHERE uqs.user_id = $1 AND q.subject_id = $2
        "#,
    )
    .bind(user.id)
    .bind(subject_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}
