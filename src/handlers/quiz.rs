// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::{AppError, ErrorResponse},
    models::{
        quiz_session::{
            CompleteQuizRequest, CompletionResult, HistoryPage, HistoryQuery, ReviewResponse,
            SessionStarted, StartQuizRequest, StartWrongQuizRequest, SubmitAnswerRequest,
            SubmitOutcome, WrongCount,
        },
        user::CurrentUser,
    },
    services::QuizService,
};

/// Starts a quiz for a subject.
///
/// Questions come back without their answer key.
#[utoipa::path(
    post,
    path = "/api/quiz/start",
    request_body = StartQuizRequest,
    tag = "Quiz",
    responses(
        (status = 201, description = "Session created", body = SessionStarted),
        (status = 400, description = "Invalid timing", body = ErrorResponse),
        (status = 403, description = "Account not approved or banned", body = ErrorResponse),
        (status = 404, description = "Subject has no questions", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn start_quiz(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = quiz.start_session(&user, req).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Starts a practice quiz with the caller's net-wrong questions.
#[utoipa::path(
    post,
    path = "/api/quiz/start-wrong",
    request_body = StartWrongQuizRequest,
    tag = "Quiz",
    responses(
        (status = 201, description = "Session created", body = SessionStarted),
        (status = 404, description = "Nothing to practice", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn start_wrong_quiz(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<StartWrongQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = quiz.start_wrong_session(&user, req).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

#[utoipa::path(
    get,
    path = "/api/quiz/wrong-count/{subject_id}",
    params(("subject_id" = i64, Path, description = "Subject id")),
    tag = "Quiz",
    responses((status = 200, description = "Number of net-wrong questions", body = WrongCount)),
    security(("jwt" = []))
)]
pub async fn wrong_count(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.wrong_count(&user, subject_id).await?))
}

/// Records an answer. Submitting the same question again replaces the
/// previous answer.
#[utoipa::path(
    post,
    path = "/api/quiz/submit",
    request_body = SubmitAnswerRequest,
    tag = "Quiz",
    responses(
        (status = 200, description = "Feedback or acknowledgement", body = SubmitOutcome),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "No such active session or question", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn submit_answer(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.submit_answer(&user, req).await?))
}

#[utoipa::path(
    post,
    path = "/api/quiz/complete",
    request_body = CompleteQuizRequest,
    tag = "Quiz",
    responses(
        (status = 200, description = "Final score", body = CompletionResult),
        (status = 404, description = "No such active session", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn complete_quiz(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CompleteQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.complete_session(&user, req.session_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/quiz/review/{session_id}",
    params(("session_id" = i64, Path, description = "Quiz session id")),
    tag = "Quiz",
    responses(
        (status = 200, description = "Session with answers and answer key", body = ReviewResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn review_quiz(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.get_review(&user, session_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/quiz/history",
    params(HistoryQuery),
    tag = "Quiz",
    responses((status = 200, description = "Caller's sessions, newest first", body = HistoryPage)),
    security(("jwt" = []))
)]
pub async fn history(
    State(quiz): State<QuizService>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quiz.history(&user, &query).await?))
}
