// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

use crate::error::AppError;

/// Smallest number of questions a regular quiz asks for.
pub const MIN_QUESTION_COUNT: i64 = 10;
/// Hard cap on questions per session (regular and wrong-answer practice).
pub const MAX_QUESTION_COUNT: i64 = 100;

/// Upper bound for per-question timer, in seconds.
pub const MAX_SECONDS_PER_QUESTION: i32 = 3_600;
/// Upper bound for whole-quiz (block) timer, in seconds.
pub const MAX_BLOCK_SECONDS: i32 = 86_400;

/// Default and maximum page sizes for quiz history.
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_expiration: u64,
    /// Refresh token lifetime when the user asks to stay logged in.
    pub refresh_remember_expiration: u64,
    pub server_port: u16,
    pub frontend_url: Option<String>,
    /// Seconds needed to replenish one auth request slot per client IP.
    pub auth_rate_period_secs: u64,
    pub auth_rate_burst: u32,
    pub rust_log: String,
    pub log_dir: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        Ok(Self {
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_refresh_secret: get_env("JWT_REFRESH_SECRET")?,
            jwt_expiration: get_env_or("JWT_EXPIRATION", 15 * 60)?,
            refresh_expiration: get_env_or("REFRESH_EXPIRATION", 24 * 60 * 60)?,
            refresh_remember_expiration: get_env_or(
                "REFRESH_REMEMBER_EXPIRATION",
                30 * 24 * 60 * 60,
            )?,
            server_port: get_env_or("SERVER_PORT", 3001)?,
            frontend_url: env::var("FRONTEND_URL").ok().filter(|v| !v.is_empty()),
            auth_rate_period_secs: get_env_or("AUTH_RATE_PERIOD_SECS", 90)?,
            auth_rate_burst: get_env_or("AUTH_RATE_BURST", 10)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_name: env::var("ADMIN_NAME").ok(),
        })
    }
}

fn get_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("{} must be set", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
