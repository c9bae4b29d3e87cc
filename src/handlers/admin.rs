// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        question::Question,
        subject::{AdminStats, ExportedQuestion, Subject, SubjectExport, UploadSubjectRequest, UploadSummary},
        user::{
            AdminCreateUserRequest, ApprovalRequest, BanRequest, CurrentUser, ROLE_ADMIN, ROLE_USER,
            ResetPasswordRequest, UpdateRoleRequest, UserProfile,
        },
    },
    utils::hash::hash_password,
};

const PROFILE_COLUMNS: &str =
    "id, username, name, role, approved, banned, theme_preference, created_at";

fn parse_role(role: &str) -> Result<&'static str, AppError> {
    match role {
        ROLE_USER => Ok(ROLE_USER),
        ROLE_ADMIN => Ok(ROLE_ADMIN),
        _ => Err(AppError::BadRequest(
            "Role must be 'user' or 'admin'".to_string(),
        )),
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// Lists all users in the system, newest first.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(users))
}

pub async fn update_role(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = parse_role(&payload.role)?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET role = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(role)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(user_not_found)?;

    tracing::info!(user_id = id, role, "User role changed");
    Ok(Json(user))
}

pub async fn set_approval(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<ApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET approved = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(payload.approved)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(user_not_found)?;

    tracing::info!(user_id = id, approved = payload.approved, "User approval changed");
    Ok(Json(user))
}

/// Bans or unbans a user. Banning revokes every refresh token they hold.
/// Admins cannot ban themselves.
pub async fn set_ban(
    State(pool): State<PgPool>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<BanRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Cannot ban your own account".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET banned = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(payload.banned)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(user_not_found)?;

    if payload.banned {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(user_id = id, banned = payload.banned, "User ban changed");
    Ok(Json(user))
}

/// Creates a new user with specific role. Accounts created by an admin are
/// approved immediately.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let role = parse_role(payload.role.as_deref().unwrap_or(ROLE_USER))?;
    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        r#"
        INSERT INTO users (username, password, name, role, approved)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.name)
    .bind(role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username already taken".to_string())
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Sets a new password and logs the user out everywhere.
pub async fn reset_password(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed = hash_password(&payload.new_password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET password = $1 WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(hashed)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(user_not_found)?;

    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "message": "Password reset successfully", "user": user })))
}

/// Deletes a user by ID, with their sessions and statistics.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    let username = sqlx::query_scalar::<_, String>("DELETE FROM users WHERE id = $1 RETURNING username")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = id, %username, "User deleted");
    Ok(Json(json!({ "message": "User deleted", "user": { "id": id, "username": username } })))
}

/// Imports a question bank.
///
/// A new name creates the subject. For an existing name the client must say
/// whether to merge (`merge: true`) or skip (`merge: false`); without either,
/// 409 is returned with the existing subject id.
/// Entries that are incomplete or whose answer is not one of the options are
/// skipped; entries whose text already exists in the subject are duplicates.
pub async fn upload_subject(
    State(pool): State<PgPool>,
    Json(payload): Json<UploadSubjectRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let total = payload.questions.len() as u64;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE name = $1 FOR UPDATE")
        .bind(&payload.subject)
        .fetch_optional(&mut *tx)
        .await?;

    let (subject_id, merged) = match (existing, payload.merge) {
        (Some(id), None) => {
            return Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "Subject already exists",
                    "message": "Subject already exists. Send merge: true to merge questions, or merge: false to skip.",
                    "existing_subject_id": id,
                    "requires_merge": true,
                })),
            )
                .into_response());
        }
        (Some(_), Some(false)) => {
            return Ok(Json(json!({ "message": "Upload skipped, subject already exists" }))
                .into_response());
        }
        (Some(id), Some(true)) => (id, true),
        (None, _) => {
            let id = sqlx::query_scalar::<_, i64>("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
                .bind(&payload.subject)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    // Another upload created the same name first
                    if is_unique_violation(&e) {
                        AppError::Conflict("Subject already exists".to_string())
                    } else {
                        AppError::from(e)
                    }
                })?;
            (id, false)
        }
    };

    let mut inserted = 0u64;
    let mut duplicates = 0u64;
    let mut skipped = 0u64;

    for entry in payload.questions {
        let Some(q) = entry.into_new_question() else {
            skipped += 1;
            continue;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO questions (subject_id, question, options, correct_answer, explanation, module)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (subject_id, question) DO NOTHING
            "#,
        )
        .bind(subject_id)
        .bind(&q.question)
        .bind(sqlx::types::Json(&q.options))
        .bind(&q.correct_answer)
        .bind(&q.explanation)
        .bind(&q.module)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            duplicates += 1;
        } else {
            inserted += 1;
        }
    }

    if merged {
        sqlx::query("UPDATE subjects SET updated_at = NOW() WHERE id = $1")
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        subject_id,
        inserted,
        duplicates,
        skipped,
        merged,
        "Question bank uploaded"
    );

    let summary = UploadSummary {
        message: if merged {
            "Questions merged successfully".to_string()
        } else {
            "Subject created successfully".to_string()
        },
        subject_id,
        inserted,
        duplicates,
        skipped,
        total,
    };

    Ok((StatusCode::CREATED, Json(summary)).into_response())
}

/// Exports a subject in the upload format.
pub async fn export_subject(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE subject_id = $1 ORDER BY module, id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SubjectExport {
        subject: subject.name,
        questions: questions.into_iter().map(ExportedQuestion::from).collect(),
    }))
}

/// Deletes a subject with its questions, sessions and statistics.
pub async fn delete_subject(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = sqlx::query_as::<_, Subject>("DELETE FROM subjects WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Subject not found".to_string()))?;

    tracing::info!(subject_id = id, name = %subject.name, "Subject deleted");
    Ok(Json(json!({ "message": "Subject deleted", "subject": subject })))
}

/// Hard-deletes a quiz session of any user.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quiz_sessions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz session not found".to_string()));
    }

    tracing::info!(session_id = id, "Quiz session deleted");
    Ok(Json(json!({ "message": "Quiz session deleted" })))
}

pub async fn dashboard_stats(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, AdminStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE NOT approved AND NOT banned) AS pending_users,
            (SELECT COUNT(*) FROM users WHERE banned) AS banned_users,
            (SELECT COUNT(*) FROM subjects) AS total_subjects,
            (SELECT COUNT(*) FROM questions) AS total_questions,
            (SELECT COUNT(*) FROM quiz_sessions) AS total_quizzes
        "#,
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}
