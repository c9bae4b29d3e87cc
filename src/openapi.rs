// src/openapi.rs

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    engine::{TimingConfig, scoring::TimingSummary},
    error::ErrorResponse,
    handlers::{health, quiz},
    models::{
        question::PublicQuestion,
        quiz_answer::ReviewAnswer,
        quiz_session::{
            CompleteQuizRequest, CompletionResult, HistoryEntry, HistoryPage, Pagination,
            QuizSession, ReviewResponse, SessionStarted, StartQuizRequest, StartWrongQuizRequest,
            SubmitAnswerRequest, SubmitOutcome, WrongCount,
        },
    },
};

/// OpenAPI document for the quiz API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Hermes Quizzer API"),
    paths(
        health::health_check,
        quiz::start_quiz,
        quiz::start_wrong_quiz,
        quiz::wrong_count,
        quiz::submit_answer,
        quiz::complete_quiz,
        quiz::review_quiz,
        quiz::history,
    ),
    components(schemas(
        TimingConfig,
        TimingSummary,
        ErrorResponse,
        PublicQuestion,
        ReviewAnswer,
        QuizSession,
        StartQuizRequest,
        StartWrongQuizRequest,
        SessionStarted,
        SubmitAnswerRequest,
        SubmitOutcome,
        CompleteQuizRequest,
        CompletionResult,
        ReviewResponse,
        WrongCount,
        HistoryEntry,
        HistoryPage,
        Pagination,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Quiz", description = "Quiz session lifecycle"),
        (name = "System", description = "Service status")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
