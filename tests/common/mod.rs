// tests/common/mod.rs

#![allow(dead_code)]

use quiztime::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

#[derive(Clone)]
pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// A quiz with one assignment and one 10-point question whose answer is "B".
#[derive(Clone, Copy)]
pub struct SeededQuiz {
    pub quiz_id: i64,
    pub assignment_id: i64,
    pub question_id: i64,
}

/// Spawns the app on a random port backed by a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    // One connection that never expires keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: Some(ADMIN_USERNAME.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        quiz_duration_secs: 600,
        submission_grace_ms: 2000,
    };

    db::seed_admin_user(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a participant and returns its id.
    pub async fn register(&self, username: &str) -> i64 {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().expect("id not found")
    }

    pub async fn login(&self, username: &str, password: &str) -> Value {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json::<Value>()
            .await
            .expect("Failed to parse login json")
    }

    /// Registers and logs in a participant, returning `(user_id, token)`.
    pub async fn participant(&self, username: &str) -> (i64, String) {
        let id = self.register(username).await;
        let login = self.login(username, PASSWORD).await;
        let token = login["token"].as_str().expect("Token not found").to_string();
        (id, token)
    }

    /// Logs in the seeded admin, returning `(user_id, token)`.
    pub async fn admin(&self) -> (i64, String) {
        let login = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        let id = login["userId"].as_i64().expect("userId not found");
        let token = login["token"].as_str().expect("Token not found").to_string();
        (id, token)
    }

    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_json(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("Failed to execute request");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// Authors a quiz through the API as `(creator_id, token)`.
    pub async fn seed_quiz(&self, creator_id: i64, token: &str, duration_secs: i64) -> SeededQuiz {
        let response = self
            .post_json(
                "/api/quizzes",
                token,
                json!({
                    "name": "Rust basics",
                    "description": "Ownership and borrowing",
                    "createdBy": creator_id,
                    "language": "en",
                    "durationSecs": duration_secs,
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let quiz_id = response.json::<Value>().await.unwrap()["quiz"]["id"]
            .as_i64()
            .unwrap();

        let response = self
            .post_json(
                &format!("/api/quizzes/{}/assignments", quiz_id),
                token,
                json!({ "name": "Part 1", "description": "Warm up" }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let assignment_id = response.json::<Value>().await.unwrap()["assignment"]["id"]
            .as_i64()
            .unwrap();

        let question_id = self.add_question(assignment_id, token, "B", 10).await;

        SeededQuiz {
            quiz_id,
            assignment_id,
            question_id,
        }
    }

    pub async fn add_question(&self, assignment_id: i64, token: &str, answer: &str, points: i64) -> i64 {
        let response = self
            .post_json(
                &format!("/api/assignments/{}/questions", assignment_id),
                token,
                json!({
                    "question": "Which one moves?",
                    "options": ["A", "B", "C"],
                    "answer": answer,
                    "points": points,
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["question"]["id"]
            .as_i64()
            .unwrap()
    }

    pub async fn submit(&self, quiz_id: i64, token: &str, body: Value) -> (u16, Value) {
        let response = self
            .post_json(&format!("/api/quizzes/{}/submit", quiz_id), token, body)
            .await;
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// Opens a play session and returns its id.
    pub async fn start_session(&self, quiz_id: i64, token: &str) -> String {
        let response = self
            .post_json(&format!("/api/quizzes/{}/sessions", quiz_id), token, json!({}))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["sessionId"]
            .as_str()
            .expect("sessionId not found")
            .to_string()
    }

    /// Opens a fresh session and submits `body` against it.
    pub async fn play(&self, quiz_id: i64, token: &str, mut body: Value) -> (u16, Value) {
        let session_id = self.start_session(quiz_id, token).await;
        body["sessionId"] = json!(session_id);
        self.submit(quiz_id, token, body).await
    }

    pub async fn attempt_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_attempts")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
