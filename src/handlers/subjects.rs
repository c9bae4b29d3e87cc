use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{subject::SubjectOverview, user::CurrentUser},
};

/// Lists every subject with its size and the caller's progress in it.
pub async fn list_subjects(
    State(pool): State<PgPool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, SubjectOverview>(
        r#"
        SELECT
            s.id, s.name, s.created_at, s.updated_at,
            COUNT(q.id) AS question_count,
            COUNT(DISTINCT q.module) AS module_count,
            COUNT(uqs.question_id) AS attempted,
            COUNT(uqs.question_id) FILTER (WHERE uqs.times_correct > 0) AS mastered
        FROM subjects s
        LEFT JOIN questions q ON q.subject_id = s.id
        LEFT JOIN user_question_stats uqs
            ON uqs.question_id = q.id AND uqs.user_id = $1
        GROUP BY s.id
        ORDER BY s.name
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(subjects))
}
