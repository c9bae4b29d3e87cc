use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{config::Config, services::QuizService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub quiz: QuizService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            quiz: QuizService::new(pool.clone()),
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for QuizService {
    fn from_ref(state: &AppState) -> Self {
        state.quiz.clone()
    }
}
