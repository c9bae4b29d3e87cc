// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{
    config::Config,
    error::AppError,
    handlers::{admin, auth, health, quiz, subjects, user},
    openapi::ApiDoc,
    state::AppState,
    utils::jwt::{admin_middleware, approved_middleware, auth_middleware},
};

fn allowed_origins(config: &Config) -> Vec<HeaderValue> {
    let mut origins = vec![
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://localhost:3000"),
    ];

    if let Some(url) = &config.frontend_url {
        match url.parse::<HeaderValue>() {
            Ok(origin) => origins.push(origin),
            Err(_) => tracing::warn!("Ignoring invalid FRONTEND_URL: {}", url),
        }
    }

    origins
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Assembles the main application router.
///
/// * Public: health, OpenAPI document, token refresh/logout.
/// * Rate-limited per client IP: register, login.
/// * Authenticated: own profile and stats.
/// * Authenticated + approved: subjects and quizzes.
/// * Authenticated + admin: administration.
pub fn create_router(state: AppState) -> Result<Router, AppError> {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(state.config.auth_rate_period_secs)
        .burst_size(state.config.auth_rate_burst)
        .finish()
        .ok_or_else(|| {
            AppError::Config("AUTH_RATE_PERIOD_SECS and AUTH_RATE_BURST must be positive".to_string())
        })?;

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf))
        .merge(
            Router::new()
                .route("/refresh", post(auth::refresh))
                .route("/logout", post(auth::logout)),
        );

    let user_routes = Router::new()
        .route("/me", get(user::get_me))
        .route("/theme", put(user::update_theme))
        .route("/stats/{subject_id}", get(user::subject_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let subject_routes = Router::new()
        .route("/", get(subjects::list_subjects))
        // Auth first, then approval check
        .route_layer(middleware::from_fn(approved_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let quiz_routes = Router::new()
        .route("/start", post(quiz::start_quiz))
        .route("/start-wrong", post(quiz::start_wrong_quiz))
        .route("/wrong-count/{subject_id}", get(quiz::wrong_count))
        .route("/submit", post(quiz::submit_answer))
        .route("/complete", post(quiz::complete_quiz))
        .route("/review/{session_id}", get(quiz::review_quiz))
        .route("/history", get(quiz::history))
        .route_layer(middleware::from_fn(approved_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/create", post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/role", put(admin::update_role))
        .route("/users/{id}/approve", put(admin::set_approval))
        .route("/users/{id}/ban", put(admin::set_ban))
        .route("/users/{id}/reset-password", put(admin::reset_password))
        .route("/subjects/upload", post(admin::upload_subject))
        .route("/subjects/{id}", delete(admin::delete_subject))
        .route("/subjects/{id}/export", get(admin::export_subject))
        .route("/quizzes/{id}", delete(admin::delete_quiz))
        .route("/stats", get(admin::dashboard_stats))
        // Double middleware protection: Auth first, then Admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Ok(Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .fallback(not_found)
        // Global Middleware: tracing outermost, then CORS
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
