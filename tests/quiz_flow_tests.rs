// tests/quiz_flow_tests.rs
//
// End-to-end quiz lifecycle against a real Postgres (DATABASE_URL).
// Each test returns early when no database is configured.

mod common;

use serde_json::{Value, json};

use common::spawn_app;

#[tokio::test]
async fn small_subject_returns_every_question_without_answer_key() {
    let Some(app) = spawn_app().await else { return };

    // Arrange
    let user = app.create_user("user", true).await;
    let (subject_id, question_ids) = app.seed_subject(3).await;

    // Act
    let response = app
        .post(
            "/api/quiz/start",
            &user.token,
            json!({ "subject_id": subject_id, "question_count": 10 }),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_questions"], 3);
    assert_eq!(body["timing"]["mode"], "untimed");

    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    for q in questions {
        assert!(question_ids.contains(&q["id"].as_i64().unwrap()));
        assert!(q.get("correct_answer").is_none());
        assert!(q.get("explanation").is_none());
        assert!(q["module"].is_string());
    }
}

#[tokio::test]
async fn revising_an_answer_updates_counts_and_stats() {
    let Some(app) = spawn_app().await else { return };

    // Arrange
    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(3).await;
    let started: Value = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id, "question_count": 10 }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = started["session_id"].as_i64().unwrap();
    let question_id = started["questions"][0]["id"].as_i64().unwrap();

    // Act: wrong first
    let first: Value = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": question_id, "selected_answer": "B", "time_taken": 12 }),
        )
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(
        first,
        json!({ "is_correct": false, "correct_answer": "A", "explanation": "A is right" })
    );
    assert_eq!(app.stat(user.id, question_id).await, Some((1, 0)));

    // Act: then right
    let second: Value = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": question_id, "selected_answer": "A", "time_taken": 20 }),
        )
        .await
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(second["is_correct"], true);
    assert_eq!(app.stat(user.id, question_id).await, Some((2, 1)));

    let (rows, correct_count): (i64, i32) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM quiz_answers WHERE session_id = $1),
               (SELECT correct_count FROM quiz_sessions WHERE id = $1)
        "#,
    )
    .bind(session_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(correct_count, 1);

    // Flip back to wrong: the running count drops again
    app.post(
        "/api/quiz/submit",
        &user.token,
        json!({ "session_id": session_id, "question_id": question_id, "selected_answer": "C" }),
    )
    .await;
    let correct_count: i32 = sqlx::query_scalar("SELECT correct_count FROM quiz_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(correct_count, 0);
    assert_eq!(app.stat(user.id, question_id).await, Some((3, 1)));
}

#[tokio::test]
async fn feedback_can_be_turned_off() {
    let Some(app) = spawn_app().await else { return };

    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(2).await;
    let started: Value = app
        .post(
            "/api/quiz/start",
            &user.token,
            json!({ "subject_id": subject_id, "question_count": 10, "show_feedback": false }),
        )
        .await
        .json()
        .await
        .unwrap();
    let session_id = started["session_id"].as_i64().unwrap();
    let q0 = started["questions"][0]["id"].as_i64().unwrap();
    let q1 = started["questions"][1]["id"].as_i64().unwrap();

    // Session default is off
    let saved: Value = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": q0, "selected_answer": "A" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(saved, json!({ "saved": true }));

    // Per-request override wins
    let feedback: Value = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": q1, "selected_answer": null, "show_feedback": true }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["is_correct"], false);
    assert_eq!(feedback["correct_answer"], "A");
}

#[tokio::test]
async fn completion_is_exactly_once_and_rounds_score() {
    let Some(app) = spawn_app().await else { return };

    // Arrange: 2 of 3 correct
    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(3).await;
    let started: Value = app
        .post(
            "/api/quiz/start",
            &user.token,
            json!({ "subject_id": subject_id, "question_count": 10, "timing": { "mode": "per_question", "seconds": 30 } }),
        )
        .await
        .json()
        .await
        .unwrap();
    let session_id = started["session_id"].as_i64().unwrap();
    for (i, answer) in ["A", "A", "B"].iter().enumerate() {
        let question_id = started["questions"][i]["id"].as_i64().unwrap();
        app.post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": question_id, "selected_answer": answer, "time_taken": 10 * (i + 1) }),
        )
        .await;
    }

    // Act
    let first = app
        .post("/api/quiz/complete", &user.token, json!({ "session_id": session_id }))
        .await;
    let second = app
        .post("/api/quiz/complete", &user.token, json!({ "session_id": session_id }))
        .await;

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    let result: Value = first.json().await.unwrap();
    assert_eq!(result["correct_count"], 2);
    assert_eq!(result["total_questions"], 3);
    assert_eq!(result["score"], 67);
    assert_eq!(result["total_time_taken"], 60);
    assert_eq!(result["avg_time_per_question"], 20);
    assert_eq!(second.status().as_u16(), 404);

    // Completed sessions no longer accept answers
    let question_id = started["questions"][2]["id"].as_i64().unwrap();
    let late = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({ "session_id": session_id, "question_id": question_id, "selected_answer": "A" }),
        )
        .await;
    assert_eq!(late.status().as_u16(), 404);

    // Review still works and exposes the answer key
    let review: Value = app
        .get(&format!("/api/quiz/review/{}", session_id), &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(review["answers"].as_array().unwrap().len(), 3);
    assert_eq!(review["answers"][0]["correct_answer"], "A");
    assert_eq!(review["session"]["time_per_question"], 30);
    assert_eq!(review["timing"]["mode"], "per_question");
    assert!(review["session"]["completed_at"].is_string());
}

#[tokio::test]
async fn wrong_practice_uses_net_wrong_questions() {
    let Some(app) = spawn_app().await else { return };

    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(4).await;

    // Nothing answered yet
    let empty = app
        .post("/api/quiz/start-wrong", &user.token, json!({ "subject_id": subject_id }))
        .await;
    assert_eq!(empty.status().as_u16(), 404);

    // Miss one question
    let started: Value = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id, "question_count": 10 }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = started["session_id"].as_i64().unwrap();
    let missed = started["questions"][0]["id"].as_i64().unwrap();
    app.post(
        "/api/quiz/submit",
        &user.token,
        json!({ "session_id": session_id, "question_id": missed, "selected_answer": "C" }),
    )
    .await;

    let count: Value = app
        .get(&format!("/api/quiz/wrong-count/{}", subject_id), &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);

    let practice: Value = app
        .post(
            "/api/quiz/start-wrong",
            &user.token,
            json!({ "subject_id": subject_id, "timing": { "mode": "block", "total_seconds": 300 } }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(practice["total_questions"], 1);
    assert_eq!(practice["questions"][0]["id"], missed);
    assert_eq!(practice["timing"]["total_seconds"], 300);
}

#[tokio::test]
async fn sessions_are_private_and_gated_by_approval() {
    let Some(app) = spawn_app().await else { return };

    let owner = app.create_user("user", true).await;
    let intruder = app.create_user("user", true).await;
    let pending = app.create_user("user", false).await;
    let (subject_id, _) = app.seed_subject(2).await;

    let started: Value = app
        .post("/api/quiz/start", &owner.token, json!({ "subject_id": subject_id, "question_count": 10 }))
        .await
        .json()
        .await
        .unwrap();
    let session_id = started["session_id"].as_i64().unwrap();
    let question_id = started["questions"][0]["id"].as_i64().unwrap();

    let foreign = app
        .post(
            "/api/quiz/submit",
            &intruder.token,
            json!({ "session_id": session_id, "question_id": question_id, "selected_answer": "A" }),
        )
        .await;
    assert_eq!(foreign.status().as_u16(), 404);

    let review = app
        .get(&format!("/api/quiz/review/{}", session_id), &intruder.token)
        .await;
    assert_eq!(review.status().as_u16(), 404);

    let blocked = app
        .post("/api/quiz/start", &pending.token, json!({ "subject_id": subject_id, "question_count": 10 }))
        .await;
    assert_eq!(blocked.status().as_u16(), 403);
    let body: Value = blocked.json().await.unwrap();
    assert_eq!(body["code"], "NOT_APPROVED");
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_write() {
    let Some(app) = spawn_app().await else { return };

    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(2).await;

    let bad_timer = app
        .post(
            "/api/quiz/start",
            &user.token,
            json!({ "subject_id": subject_id, "question_count": 10, "timing": { "mode": "per_question", "seconds": 0 } }),
        )
        .await;
    assert_eq!(bad_timer.status().as_u16(), 400);

    let zero_count = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id, "question_count": 0 }))
        .await;
    assert_eq!(zero_count.status().as_u16(), 400);

    // Missing count fails body extraction
    let no_count = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id }))
        .await;
    assert!(no_count.status().is_client_error());

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_sessions WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(sessions, 0);

    let empty_subject = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": -1, "question_count": 10 }))
        .await;
    assert_eq!(empty_subject.status().as_u16(), 404);

    let started: Value = app
        .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id, "question_count": 10 }))
        .await
        .json()
        .await
        .unwrap();
    let negative_time = app
        .post(
            "/api/quiz/submit",
            &user.token,
            json!({
                "session_id": started["session_id"],
                "question_id": started["questions"][0]["id"],
                "selected_answer": "A",
                "time_taken": -1
            }),
        )
        .await;
    assert_eq!(negative_time.status().as_u16(), 400);
}

#[tokio::test]
async fn history_is_paginated_newest_first() {
    let Some(app) = spawn_app().await else { return };

    let user = app.create_user("user", true).await;
    let (subject_id, _) = app.seed_subject(1).await;
    let mut session_ids = Vec::new();
    for _ in 0..3 {
        let started: Value = app
            .post("/api/quiz/start", &user.token, json!({ "subject_id": subject_id, "question_count": 10 }))
            .await
            .json()
            .await
            .unwrap();
        session_ids.push(started["session_id"].as_i64().unwrap());
    }

    let page: Value = app
        .get("/api/quiz/history?page=1&limit=2", &user.token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["total_pages"], 2);
    let sessions = page["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["id"], session_ids[2]);
    assert!(sessions[0]["subject_name"].is_string());
}

#[tokio::test]
async fn history_rejects_pages_past_the_end_of_the_range() {
    let Some(app) = spawn_app().await else { return };

    let user = app.create_user("user", true).await;

    let response = app
        .get(
            &format!("/api/quiz/history?page={}&limit=100", i64::MAX),
            &user.token,
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Page is out of range");
}
