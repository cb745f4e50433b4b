// tests/play_tests.rs

mod common;

use common::{SeededQuiz, TestApp, spawn_app};
use serde_json::{Value, json};

async fn admin_quiz(app: &TestApp, duration_secs: i64) -> SeededQuiz {
    let (admin_id, admin_token) = app.admin().await;
    app.seed_quiz(admin_id, &admin_token, duration_secs).await
}

fn answer(question_id: i64, option: &str) -> Value {
    json!({ question_id.to_string(): option })
}

#[tokio::test]
async fn correct_answer_scores_points_times_seconds_left() {
    // Arrange
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (user_id, token) = app.participant("player").await;

    // Act
    let (status, body) = app
        .play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 2000 }),
        )
        .await;

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["duplicate"], false);
    assert_eq!(body["correctCount"], 1);
    assert_eq!(body["quizAttempt"]["score"], 20);
    assert_eq!(body["quizAttempt"]["rawScore"], 10);
    assert_eq!(body["quizAttempt"]["userId"], user_id);
}

#[tokio::test]
async fn wrong_answer_scores_zero() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let (status, body) = app
        .play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "C"), "timeRemaining": 2000 }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["quizAttempt"]["score"], 0);
    assert_eq!(body["correctCount"], 0);
}

#[tokio::test]
async fn fractional_scores_are_floored() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    // 10 points * 1.55s = 15.5
    let (_, body) = app
        .play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 1550 }),
        )
        .await;

    assert_eq!(body["quizAttempt"]["score"], 15);
}

#[tokio::test]
async fn missing_fields_are_rejected_without_an_attempt() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let (status, body) = app
        .submit(quiz.quiz_id, &token, json!({ "answers": answer(quiz.question_id, "B") }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Both answers and timeRemaining are required");

    let (status, _) = app
        .submit(quiz.quiz_id, &token, json!({ "timeRemaining": 5000 }))
        .await;
    assert_eq!(status, 400);

    assert_eq!(app.attempt_count().await, 0);
}

#[tokio::test]
async fn zero_time_remaining_is_accepted() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let (status, body) = app
        .play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 0 }),
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["quizAttempt"]["score"], 0);
    assert_eq!(body["correctCount"], 1);
}

#[tokio::test]
async fn submitting_to_an_unknown_quiz_fails() {
    let app = spawn_app().await;
    let (_, token) = app.participant("player").await;

    let (status, body) = app
        .submit(4242, &token, json!({ "answers": {}, "timeRemaining": 1000 }))
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(app.attempt_count().await, 0);
}

#[tokio::test]
async fn answers_to_other_quizzes_are_ignored() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let other = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let mut answers = answer(quiz.question_id, "C");
    answers[other.question_id.to_string()] = json!("B");
    answers["not-a-number"] = json!("B");

    let (status, body) = app
        .play(quiz.quiz_id, &token, json!({ "answers": answers, "timeRemaining": 5000 }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["quizAttempt"]["score"], 0);
    assert_eq!(body["correctCount"], 0);
}

#[tokio::test]
async fn numeric_answers_match_textual_keys() {
    let app = spawn_app().await;
    let (admin_id, admin_token) = app.admin().await;
    let quiz = app.seed_quiz(admin_id, &admin_token, 60).await;

    let response = app
        .post_json(
            &format!("/api/assignments/{}/questions", quiz.assignment_id),
            &admin_token,
            json!({
                "question": "2 + 2",
                "options": ["3", "4"],
                "answer": "4",
                "points": 5,
            }),
        )
        .await;
    let numeric_id = response.json::<Value>().await.unwrap()["question"]["id"]
        .as_i64()
        .unwrap();
    let (_, token) = app.participant("player").await;

    let mut answers = answer(quiz.question_id, "B");
    answers[numeric_id.to_string()] = json!(4);

    let (_, body) = app
        .play(quiz.quiz_id, &token, json!({ "answers": answers, "timeRemaining": 1000 }))
        .await;

    assert_eq!(body["quizAttempt"]["rawScore"], 15);
    assert_eq!(body["correctCount"], 2);
}

#[tokio::test]
async fn attempt_lands_once_in_leaderboard_and_history() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (user_id, token) = app.participant("player").await;

    let (_, body) = app
        .play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 3000 }),
        )
        .await;
    let attempt_id = body["quizAttempt"]["id"].as_i64().unwrap();

    let (status, board) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard", quiz.quiz_id), None)
        .await;
    assert_eq!(status, 200);
    let entries = board["leaderboard"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["attemptId"], attempt_id);
    assert_eq!(entries[0]["username"], "player");
    assert_eq!(entries[0]["score"], 30);

    let (status, history) = app.get_json("/api/users/me/attempts", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(history["userId"], user_id);
    let attempts = history["quizAttempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["attemptId"], attempt_id);
    assert_eq!(attempts[0]["quizName"], "Rust basics");

    let (_, quiz_body) = app.get_json(&format!("/api/quizzes/{}", quiz.quiz_id), None).await;
    assert_eq!(quiz_body["leaderboardSize"], 1);
}

#[tokio::test]
async fn stored_attempts_are_immutable() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;
    app.play(
        quiz.quiz_id,
        &token,
        json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 3000 }),
    )
    .await;

    let update = sqlx::query("UPDATE quiz_attempts SET score = 999999")
        .execute(&app.pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM quiz_attempts").execute(&app.pool).await;
    assert!(delete.is_err());

    let score: i64 = sqlx::query_scalar("SELECT score FROM quiz_attempts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(score, 30);
}

#[tokio::test]
async fn session_is_graded_only_once() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let ticket: Value = app
        .post_json(&format!("/api/quizzes/{}/sessions", quiz.quiz_id), &token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    let session_id = ticket["sessionId"].as_str().unwrap().to_string();
    assert_eq!(ticket["durationSecs"], 60);

    let body = json!({
        "answers": answer(quiz.question_id, "B"),
        "timeRemaining": 1000,
        "sessionId": session_id,
    });

    let (first_status, first) = app.submit(quiz.quiz_id, &token, body.clone()).await;
    let (second_status, second) = app.submit(quiz.quiz_id, &token, body).await;

    assert_eq!(first_status, 200);
    assert_eq!(second_status, 200);
    assert_eq!(first["duplicate"], false);
    assert_eq!(second["duplicate"], true);
    assert_eq!(first["quizAttempt"]["id"], second["quizAttempt"]["id"]);
    assert_eq!(app.attempt_count().await, 1);

    let (_, board) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard", quiz.quiz_id), None)
        .await;
    assert_eq!(board["leaderboard"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn session_of_another_user_is_refused() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, owner_token) = app.participant("owner").await;
    let (_, thief_token) = app.participant("thief").await;

    let ticket: Value = app
        .post_json(&format!("/api/quizzes/{}/sessions", quiz.quiz_id), &owner_token, json!({}))
        .await
        .json()
        .await
        .unwrap();

    let (status, body) = app
        .submit(
            quiz.quiz_id,
            &thief_token,
            json!({
                "answers": answer(quiz.question_id, "B"),
                "timeRemaining": 1000,
                "sessionId": ticket["sessionId"],
            }),
        )
        .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Unknown session for this quiz");
    assert_eq!(app.attempt_count().await, 0);
}

#[tokio::test]
async fn inflated_time_is_clamped_to_the_session_deadline() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let ticket: Value = app
        .post_json(&format!("/api/quizzes/{}/sessions", quiz.quiz_id), &token, json!({}))
        .await
        .json()
        .await
        .unwrap();

    let (_, body) = app
        .submit(
            quiz.quiz_id,
            &token,
            json!({
                "answers": answer(quiz.question_id, "B"),
                "timeRemaining": 10_000_000,
                "sessionId": ticket["sessionId"],
            }),
        )
        .await;

    // Never more than the 60s the session lasts.
    let score = body["quizAttempt"]["score"].as_i64().unwrap();
    assert!(score <= 600, "score {} exceeds the session length", score);
    assert!(score >= 580, "score {} is unexpectedly low", score);
}

#[tokio::test]
async fn submission_without_session_is_rejected() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;
    let body = json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": 999_999 });

    for _ in 0..3 {
        let (status, response) = app.submit(quiz.quiz_id, &token, body.clone()).await;
        assert_eq!(status, 400);
        assert_eq!(response["error"], "sessionId is required");
    }

    assert_eq!(app.attempt_count().await, 0);
    let (_, board) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard", quiz.quiz_id), None)
        .await;
    assert_eq!(board["leaderboard"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn aliased_question_keys_score_once() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;
    let (_, token) = app.participant("player").await;

    let id = quiz.question_id;
    let mut answers = answer(id, "B");
    for alias in [format!("0{}", id), format!("+{}", id), format!("00{}", id)] {
        answers[alias] = json!("B");
    }

    let (status, body) = app
        .play(quiz.quiz_id, &token, json!({ "answers": answers, "timeRemaining": 2000 }))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["quizAttempt"]["rawScore"], 10);
    assert_eq!(body["correctCount"], 1);
    assert_eq!(body["quizAttempt"]["score"], 20);
}

#[tokio::test]
async fn leaderboard_can_be_ranked_by_score() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;

    for (name, time) in [("slow", 1000), ("fast", 3000), ("tied", 3000)] {
        let (_, token) = app.participant(name).await;
        app.play(
            quiz.quiz_id,
            &token,
            json!({ "answers": answer(quiz.question_id, "B"), "timeRemaining": time }),
        )
        .await;
    }

    let (_, appended) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard", quiz.quiz_id), None)
        .await;
    let names: Vec<&str> = appended["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["slow", "fast", "tied"]);
    assert!(appended["leaderboard"][0].get("rank").is_none());

    let (_, ranked) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard?sort=score", quiz.quiz_id), None)
        .await;
    let ranked: Vec<(String, i64, i64)> = ranked["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["username"].as_str().unwrap().to_string(),
                e["score"].as_i64().unwrap(),
                e["rank"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        ranked,
        [
            ("fast".to_string(), 30, 1),
            ("tied".to_string(), 30, 1),
            ("slow".to_string(), 10, 3),
        ]
    );
}

#[tokio::test]
async fn concurrent_submissions_do_not_interfere() {
    let app = spawn_app().await;
    let quiz = admin_quiz(&app, 60).await;

    let mut tokens = Vec::new();
    for i in 0..5 {
        let (_, token) = app.participant(&format!("player{}", i)).await;
        tokens.push(token);
    }

    let mut set = tokio::task::JoinSet::new();
    for (i, token) in tokens.iter().enumerate() {
        let app = app.clone();
        let token = token.clone();
        let body = json!({
            "answers": answer(quiz.question_id, "B"),
            "timeRemaining": 1000 * (i as i64 + 1),
        });
        set.spawn(async move { app.play(quiz.quiz_id, &token, body).await });
    }
    let results = set.join_all().await;

    for (status, _) in &results {
        assert_eq!(*status, 200);
    }

    let (_, board) = app
        .get_json(&format!("/api/quizzes/{}/leaderboard", quiz.quiz_id), None)
        .await;
    let mut scores: Vec<i64> = board["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["score"].as_i64().unwrap())
        .collect();
    scores.sort();
    assert_eq!(scores, [10, 20, 30, 40, 50]);

    for token in &tokens {
        let (_, history) = app.get_json("/api/users/me/attempts", Some(token)).await;
        assert_eq!(history["quizAttempts"].as_array().unwrap().len(), 1);
    }
}
