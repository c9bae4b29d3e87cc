// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{
        AuthResponse, CreateUserRequest, LoginRequest, LogoutRequest, RefreshRequest, User,
        UserProfile,
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{sign_access_token, sign_refresh_token, verify_refresh_token},
    },
};

/// Issues an access/refresh pair and stores the refresh token.
async fn issue_tokens(
    pool: &PgPool,
    config: &Config,
    user: User,
    refresh_lifetime: u64,
) -> Result<AuthResponse, AppError> {
    let access_token = sign_access_token(
        user.id,
        &user.username,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    let refresh_token = sign_refresh_token(user.id, &config.jwt_refresh_secret, refresh_lifetime)?;

    let expires_at = Utc::now() + Duration::seconds(refresh_lifetime as i64);
    sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)")
        .bind(user.id)
        .bind(&refresh_token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(AuthResponse {
        user: UserProfile::from(user),
        access_token,
        refresh_token,
        token_type: "Bearer",
    })
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. The account starts
/// unapproved: it can log in but cannot take quizzes until an admin approves it.
/// Returns 201 Created with the user and a token pair.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, name)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username already taken".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let response = issue_tokens(&pool, &config, user, config.refresh_expiration).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticates a user and returns a token pair.
///
/// Unknown usernames and wrong passwords get the same message.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await?;

    let invalid = || AppError::AuthError("Invalid username or password".to_string());
    let user = user.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    if user.banned {
        return Err(AppError::banned());
    }

    let refresh_lifetime = if payload.stay_logged_in {
        config.refresh_remember_expiration
    } else {
        config.refresh_expiration
    };

    tracing::info!(user_id = user.id, "User logged in");

    let response = issue_tokens(&pool, &config, user, refresh_lifetime).await?;
    Ok(Json(response))
}

/// Exchanges a stored, unexpired refresh token for a new access token.
pub async fn refresh(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let stored = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM refresh_tokens WHERE token = $1 AND expires_at > NOW()",
    )
    .bind(&payload.refresh_token)
    .fetch_optional(&pool)
    .await?;

    if stored.is_none() {
        return Err(AppError::AuthError(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let claims = verify_refresh_token(&payload.refresh_token, &config.jwt_refresh_secret)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.user_id()?)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    if user.banned {
        return Err(AppError::banned());
    }

    let access_token = sign_access_token(
        user.id,
        &user.username,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({ "access_token": access_token, "type": "Bearer" })))
}

/// Revokes the given refresh token. Succeeds even when it is unknown.
pub async fn logout(
    State(pool): State<PgPool>,
    Json(payload): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = payload.refresh_token {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&pool)
            .await?;
    }

    Ok(Json(json!({ "message": "Logged out successfully" })))
}
