// tests/common/mod.rs

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use hermes_quizzer::{
    config::Config, routes, state::AppState, utils::hash::hash_password,
    utils::jwt::sign_access_token,
};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const TEST_PASSWORD: &str = "password123";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_refresh_secret: "test_refresh_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        refresh_expiration: 3_600,
        refresh_remember_expiration: 7_200,
        server_port: 0,
        frontend_url: None,
        auth_rate_period_secs: 1,
        auth_rate_burst: 1_000,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        admin_username: None,
        admin_password: None,
        admin_name: None,
    }
}

/// Router over a pool that never connects. Good for everything that is
/// rejected before the first query runs.
pub fn lazy_router(config: Config) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    routes::create_router(AppState::new(pool, config)).expect("router")
}

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub config: Config,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against `DATABASE_URL`.
/// Returns `None` when no database is configured so DB tests can be skipped.
pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = test_config(&database_url);
    let app = routes::create_router(AppState::new(pool.clone(), config.clone())).expect("router");

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        config,
        client: reqwest::Client::new(),
    })
}

pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Inserts a user directly and signs an access token for it.
    pub async fn create_user(&self, role: &str, approved: bool) -> TestUser {
        let username = unique("u");
        let hash = hash_password(TEST_PASSWORD).unwrap();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password, name, role, approved) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&username)
        .bind(hash)
        .bind("Test User")
        .bind(role)
        .bind(approved)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        let token = sign_access_token(
            id,
            &username,
            role,
            &self.config.jwt_secret,
            self.config.jwt_expiration,
        )
        .unwrap();

        TestUser {
            id,
            username,
            token,
        }
    }

    /// Creates a subject whose questions all have options ["A", "B", "C"]
    /// and correct answer "A". Returns the subject id and question ids.
    pub async fn seed_subject(&self, question_count: usize) -> (i64, Vec<i64>) {
        let subject_id: i64 = sqlx::query_scalar("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
            .bind(unique("subject"))
            .fetch_one(&self.pool)
            .await
            .unwrap();

        let mut ids = Vec::with_capacity(question_count);
        for i in 0..question_count {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO questions (subject_id, question, options, correct_answer, explanation, module)
                VALUES ($1, $2, $3, 'A', 'A is right', $4)
                RETURNING id
                "#,
            )
            .bind(subject_id)
            .bind(format!("Question {}", i))
            .bind(serde_json::json!(["A", "B", "C"]))
            .bind(format!("Module {}", i % 2))
            .fetch_one(&self.pool)
            .await
            .unwrap();
            ids.push(id);
        }

        (subject_id, ids)
    }

    pub async fn post(&self, path: &str, token: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn stat(&self, user_id: i64, question_id: i64) -> Option<(i32, i32)> {
        sqlx::query_as(
            "SELECT times_attempted, times_correct FROM user_question_stats WHERE user_id = $1 AND question_id = $2",
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap()
    }
}
