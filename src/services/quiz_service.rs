// src/services/quiz_service.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::MAX_QUESTION_COUNT,
    engine::{
        TimingConfig,
        scoring::{
            TimingSummary, correct_count_delta, is_correct, normalize_selection, score_percentage,
        },
        selection::{clamp_question_count, is_net_wrong, select_by_priority, shuffle_and_take},
    },
    error::AppError,
    models::{
        question::{AnswerKey, PublicQuestion, QuestionCandidate},
        quiz_answer::ReviewAnswer,
        quiz_session::{
            CompletionResult, HistoryEntry, HistoryPage, HistoryQuery, Pagination, QuizSession,
            ReviewResponse, SessionStarted, StartQuizRequest, StartWrongQuizRequest, SubmitAnswerRequest,
            SubmitOutcome, WrongCount,
        },
        user::CurrentUser,
    },
};

const ACTIVE_SESSION_NOT_FOUND: &str = "Active quiz session not found";

/// Owns the quiz session lifecycle: start, answer, complete, review.
///
/// Every operation is scoped to the calling user; sessions owned by someone
/// else are reported as missing.
#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

/// Parameters shared by both kinds of session.
struct NewSession {
    subject_id: i64,
    timing: TimingConfig,
    show_feedback: bool,
    questions: Vec<PublicQuestion>,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a regular quiz, preferring questions the user has never seen,
    /// then questions never answered correctly.
    pub async fn start_session(
        &self,
        user: &CurrentUser,
        req: StartQuizRequest,
    ) -> Result<SessionStarted, AppError> {
        user.ensure_can_quiz()?;
        req.validate()?;
        req.timing.validate()?;

        let candidates = sqlx::query_as::<_, QuestionCandidate>(
            r#"
            SELECT q.id, q.question, q.options, q.module,
                   uqs.times_attempted, uqs.times_correct
            FROM questions q
            LEFT JOIN user_question_stats uqs
                ON uqs.question_id = q.id AND uqs.user_id = $1
            WHERE q.subject_id = $2
            "#,
        )
        .bind(user.id)
        .bind(req.subject_id)
        .fetch_all(&self.pool)
        .await?;

        if candidates.is_empty() {
            return Err(AppError::NotFound(
                "No questions found for this subject".to_string(),
            ));
        }

        let count = clamp_question_count(req.question_count, candidates.len() as i64) as usize;
        let selected = {
            let mut rng = rand::thread_rng();
            select_by_priority(candidates, count, &mut rng)
        };

        self.create_session(
            user,
            NewSession {
                subject_id: req.subject_id,
                timing: req.timing,
                show_feedback: req.show_feedback.unwrap_or(true),
                questions: selected.into_iter().map(PublicQuestion::from).collect(),
            },
        )
        .await
    }

    /// Starts a practice quiz made only of questions the user has more wrong
    /// attempts than right ones for.
    pub async fn start_wrong_session(
        &self,
        user: &CurrentUser,
        req: StartWrongQuizRequest,
    ) -> Result<SessionStarted, AppError> {
        user.ensure_can_quiz()?;
        req.timing.validate()?;

        let attempted = sqlx::query_as::<_, QuestionCandidate>(
            r#"
            SELECT q.id, q.question, q.options, q.module,
                   uqs.times_attempted, uqs.times_correct
            FROM questions q
            JOIN user_question_stats uqs
                ON uqs.question_id = q.id AND uqs.user_id = $1
            WHERE q.subject_id = $2
            "#,
        )
        .bind(user.id)
        .bind(req.subject_id)
        .fetch_all(&self.pool)
        .await?;

        let wrong: Vec<QuestionCandidate> = attempted
            .into_iter()
            .filter(|c| {
                is_net_wrong(
                    c.times_attempted.unwrap_or(0),
                    c.times_correct.unwrap_or(0),
                )
            })
            .collect();

        if wrong.is_empty() {
            return Err(AppError::NotFound(
                "No wrong answers to practice for this subject".to_string(),
            ));
        }

        let selected = {
            let mut rng = rand::thread_rng();
            shuffle_and_take(wrong, MAX_QUESTION_COUNT as usize, &mut rng)
        };

        self.create_session(
            user,
            NewSession {
                subject_id: req.subject_id,
                timing: req.timing,
                show_feedback: req.show_feedback.unwrap_or(true),
                questions: selected.into_iter().map(PublicQuestion::from).collect(),
            },
        )
        .await
    }

    /// Persists the session and the ordered list of questions it was dealt.
    async fn create_session(
        &self,
        user: &CurrentUser,
        new: NewSession,
    ) -> Result<SessionStarted, AppError> {
        let total_questions = new.questions.len() as i32;

        let mut tx = self.pool.begin().await?;

        let session_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quiz_sessions (
                user_id, subject_id, total_questions, is_timed,
                timer_mode, time_per_question, total_time, show_feedback
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(new.subject_id)
        .bind(total_questions)
        .bind(new.timing.is_timed())
        .bind(new.timing.mode_label())
        .bind(new.timing.time_per_question())
        .bind(new.timing.total_time())
        .bind(new.show_feedback)
        .fetch_one(&mut *tx)
        .await?;

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO quiz_session_questions (session_id, question_id, position) ",
        );
        builder.push_values(new.questions.iter().enumerate(), |mut row, (position, q)| {
            row.push_bind(session_id)
                .push_bind(q.id)
                .push_bind(position as i32);
        });
        builder.build().execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = user.id,
            session_id,
            subject_id = new.subject_id,
            total_questions,
            timed = new.timing.is_timed(),
            "Quiz session started"
        );

        Ok(SessionStarted {
            session_id,
            subject_id: new.subject_id,
            total_questions,
            timing: new.timing,
            show_feedback: new.show_feedback,
            questions: new.questions,
        })
    }

    /// Records (or revises) the answer to one question of an active session.
    ///
    /// Runs in a single transaction holding the session row lock, so the
    /// running correct count and the user's statistics move together.
    pub async fn submit_answer(
        &self,
        user: &CurrentUser,
        req: SubmitAnswerRequest,
    ) -> Result<SubmitOutcome, AppError> {
        user.ensure_can_quiz()?;
        req.validate()?;

        let selected = normalize_selection(req.selected_answer);

        let mut tx = self.pool.begin().await?;

        let session_feedback = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT show_feedback FROM quiz_sessions
            WHERE id = $1 AND user_id = $2 AND completed_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(req.session_id)
        .bind(user.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(ACTIVE_SESSION_NOT_FOUND.to_string()))?;

        let key = sqlx::query_as::<_, AnswerKey>(
            r#"
            SELECT q.correct_answer, q.explanation
            FROM quiz_session_questions sq
            JOIN questions q ON q.id = sq.question_id
            WHERE sq.session_id = $1 AND sq.question_id = $2
            "#,
        )
        .bind(req.session_id)
        .bind(req.question_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found in this session".to_string()))?;

        let correct = is_correct(selected.as_deref(), &key.correct_answer);

        let previous = sqlx::query_scalar::<_, bool>(
            "SELECT is_correct FROM quiz_answers WHERE session_id = $1 AND question_id = $2",
        )
        .bind(req.session_id)
        .bind(req.question_id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO quiz_answers (session_id, question_id, selected_answer, is_correct, time_taken)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id, question_id) DO UPDATE SET
                selected_answer = EXCLUDED.selected_answer,
                is_correct = EXCLUDED.is_correct,
                time_taken = EXCLUDED.time_taken,
                answered_at = NOW()
            "#,
        )
        .bind(req.session_id)
        .bind(req.question_id)
        .bind(selected.as_deref())
        .bind(correct)
        .bind(req.time_taken)
        .execute(&mut *tx)
        .await?;

        let delta = correct_count_delta(previous, correct);
        if delta != 0 {
            sqlx::query("UPDATE quiz_sessions SET correct_count = correct_count + $1 WHERE id = $2")
                .bind(delta)
                .bind(req.session_id)
                .execute(&mut *tx)
                .await?;
        }

        // Every submission counts as an attempt, revisions included.
        sqlx::query(
            r#"
            INSERT INTO user_question_stats (user_id, question_id, times_attempted, times_correct, last_attempted_at)
            VALUES ($1, $2, 1, $3, NOW())
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                times_attempted = user_question_stats.times_attempted + 1,
                times_correct = user_question_stats.times_correct + EXCLUDED.times_correct,
                last_attempted_at = NOW()
            "#,
        )
        .bind(user.id)
        .bind(req.question_id)
        .bind(i32::from(correct))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = user.id,
            session_id = req.session_id,
            question_id = req.question_id,
            is_correct = correct,
            revised = previous.is_some(),
            "Answer recorded"
        );

        if req.show_feedback.unwrap_or(session_feedback) {
            Ok(SubmitOutcome::Feedback {
                is_correct: correct,
                correct_answer: key.correct_answer,
                explanation: key.explanation,
            })
        } else {
            Ok(SubmitOutcome::Saved { saved: true })
        }
    }

    /// Closes an active session exactly once.
    ///
    /// The claim and the final correct count happen in one statement; a
    /// second call finds no active session.
    pub async fn complete_session(
        &self,
        user: &CurrentUser,
        session_id: i64,
    ) -> Result<CompletionResult, AppError> {
        user.ensure_can_quiz()?;

        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            UPDATE quiz_sessions
            SET completed_at = NOW(),
                correct_count = (
                    SELECT COUNT(*) FROM quiz_answers
                    WHERE session_id = $1 AND is_correct
                )::INT
            WHERE id = $1 AND user_id = $2 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(ACTIVE_SESSION_NOT_FOUND.to_string()))?;

        let completed_at = session.completed_at.ok_or_else(|| {
            AppError::InternalServerError("Completed session has no completion time".to_string())
        })?;

        let times = sqlx::query_scalar::<_, i32>(
            "SELECT time_taken FROM quiz_answers WHERE session_id = $1 AND time_taken IS NOT NULL",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        let timing = TimingSummary::from_times(times);

        let score = score_percentage(session.correct_count, session.total_questions);

        tracing::info!(
            user_id = user.id,
            session_id,
            subject_id = session.subject_id,
            correct_count = session.correct_count,
            total_questions = session.total_questions,
            score,
            "Quiz session completed"
        );

        Ok(CompletionResult {
            session_id: session.id,
            total_questions: session.total_questions,
            correct_count: session.correct_count,
            score,
            completed_at,
            total_time_taken: timing.total_time_taken,
            avg_time_per_question: timing.avg_time_per_question,
        })
    }

    /// Answers recorded so far, with the answer key. Works for active and
    /// completed sessions alike.
    pub async fn get_review(
        &self,
        user: &CurrentUser,
        session_id: i64,
    ) -> Result<ReviewResponse, AppError> {
        user.ensure_can_quiz()?;

        let session = sqlx::query_as::<_, QuizSession>(
            "SELECT * FROM quiz_sessions WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))?;

        let answers = sqlx::query_as::<_, ReviewAnswer>(
            r#"
            SELECT qa.id, qa.session_id, qa.question_id, qa.selected_answer,
                   qa.is_correct, qa.time_taken, qa.answered_at,
                   q.question, q.options, q.correct_answer, q.explanation, q.module
            FROM quiz_answers qa
            JOIN questions q ON q.id = qa.question_id
            WHERE qa.session_id = $1
            ORDER BY qa.answered_at, qa.id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let timing = TimingSummary::from_times(answers.iter().filter_map(|a| a.time_taken));

        tracing::debug!(
            user_id = user.id,
            session_id,
            active = session.is_active(),
            answers = answers.len(),
            "Quiz review loaded"
        );

        Ok(ReviewResponse {
            timing: session.timing(),
            session,
            answers,
            total_time_taken: timing.total_time_taken,
            avg_time_per_question: timing.avg_time_per_question,
        })
    }

    /// Number of questions in the subject a wrong-answer practice would use.
    pub async fn wrong_count(
        &self,
        user: &CurrentUser,
        subject_id: i64,
    ) -> Result<WrongCount, AppError> {
        user.ensure_can_quiz()?;

        let stats = sqlx::query_as::<_, (i32, i32)>(
            r#"
            SELECT uqs.times_attempted, uqs.times_correct
            FROM user_question_stats uqs
            JOIN questions q ON q.id = uqs.question_id
            WHERE uqs.user_id = $1 AND q.subject_id = $2
            "#,
        )
        .bind(user.id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        let count = stats
            .into_iter()
            .filter(|&(attempted, correct)| is_net_wrong(attempted, correct))
            .count() as i64;

        Ok(WrongCount { count })
    }

    /// The caller's sessions, newest first.
    pub async fn history(
        &self,
        user: &CurrentUser,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, AppError> {
        user.ensure_can_quiz()?;

        let (page, limit) = query.resolve();
        let offset = query.offset()?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_sessions WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?;

        let sessions = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT qs.id, qs.subject_id, s.name AS subject_name, qs.total_questions,
                   qs.correct_count, qs.is_timed, qs.timer_mode, qs.started_at, qs.completed_at
            FROM quiz_sessions qs
            JOIN subjects s ON s.id = qs.subject_id
            WHERE qs.user_id = $1
            ORDER BY qs.started_at DESC, qs.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(HistoryPage {
            sessions,
            pagination: Pagination::new(page, limit, total),
        })
    }
}
