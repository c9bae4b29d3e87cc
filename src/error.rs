// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // 500 Internal Server Error
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // 500, raised while loading configuration at startup
    #[error("Configuration error: {0}")]
    Config(String),

    // 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("Unauthorized: {0}")]
    AuthError(String),

    // 401 with a machine-readable code so clients know to refresh
    #[error("Token expired")]
    TokenExpired,

    // 403 Forbidden (not approved, banned, wrong role)
    #[error("Forbidden: {message}")]
    Forbidden { message: String, code: &'static str },

    // 404 Not Found
    #[error("Not found: {0}")]
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason, e.g. `TOKEN_EXPIRED` or `NOT_APPROVED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub code: Option<&'static str>,
}

impl AppError {
    pub fn not_approved() -> Self {
        AppError::Forbidden {
            message: "Account pending admin approval".to_string(),
            code: "NOT_APPROVED",
        }
    }

    pub fn banned() -> Self {
        AppError::Forbidden {
            message: "Account has been banned".to_string(),
            code: "BANNED",
        }
    }

    pub fn admin_only() -> Self {
        AppError::Forbidden {
            message: "Admin access required".to_string(),
            code: "FORBIDDEN",
        }
    }
}

/// Converts the error into a JSON response with appropriate HTTP status code.
/// Server-side failures are logged and replaced with a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::InternalServerError(msg) | AppError::Config(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "Token expired".to_string(),
                Some("TOKEN_EXPIRED"),
            ),
            AppError::Forbidden { message, code } => (StatusCode::FORBIDDEN, message, Some(code)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
        };

        let body = ErrorResponse {
            error: error_message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// True when the database rejected a write because of a unique constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
