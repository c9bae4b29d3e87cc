// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::PgPool;

use crate::{config::Config, error::AppError, models::user::CurrentUser};

/// Access token claims.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// User's role (e.g., 'user', 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))
    }
}

/// Refresh token claims. `jti` makes every issued token unique so it can be
/// stored and revoked individually.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub exp: usize,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid refresh token".to_string()))
    }
}

fn expires_in(seconds: u64) -> Result<usize, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();
    Ok((now + seconds) as usize)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a short-lived access token for the user.
pub fn sign_access_token(
    id: i64,
    username: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        role: role.to_owned(),
        exp: expires_in(expiration_seconds)?,
    };
    sign(&claims, secret)
}

/// Signs a refresh token. The caller is responsible for persisting it.
pub fn sign_refresh_token(
    id: i64,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = RefreshClaims {
        sub: id.to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expires_in(expiration_seconds)?,
    };
    sign(&claims, secret)
}

fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, AppError> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::AuthError("Invalid token".to_string()),
    })
}

/// Verifies and decodes an access token.
///
/// Expired tokens are reported as `TokenExpired` so clients know to refresh.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify(token, secret)
}

pub fn verify_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims, AppError> {
    verify::<RefreshClaims>(token, secret).map_err(|e| match e {
        AppError::TokenExpired => AppError::AuthError("Invalid or expired refresh token".to_string()),
        other => other,
    })
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, then loads the user
/// so that role, approval and ban changes take effect immediately.
/// Injects `CurrentUser` into the request extensions.
pub async fn auth_middleware(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Access token required".to_string()))?;

    let claims = verify_access_token(token, &config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, CurrentUser>(
        "SELECT id, username, name, role, approved, banned FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    if user.banned {
        return Err(AppError::banned());
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Axum Middleware: Approval gate.
///
/// Must be used AFTER `auth_middleware`.
pub async fn approved_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::AuthError("Access token required".to_string()))?;

    if !user.approved {
        return Err(AppError::not_approved());
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `CurrentUser` has 'admin' role.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::AuthError("Access token required".to_string()))?;

    if !user.is_admin() {
        return Err(AppError::admin_only());
    }

    Ok(next.run(req).await)
}
