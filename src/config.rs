// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

/// Upper bound on answer entries accepted in one submission.
pub const MAX_ANSWERS_PER_SUBMISSION: usize = 500;

/// Longest duration an author may give a quiz (24h).
pub const MAX_QUIZ_DURATION_SECS: i64 = 86_400;

pub const ADMIN_ACCOUNT: &str = "admin";
pub const PARTICIPANT_ACCOUNT: &str = "participant";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub bind_addr: SocketAddr,
    /// Duration given to quizzes whose author did not pick one.
    pub quiz_duration_secs: i64,
    /// Allowance for network delay when bounding client-reported remaining time.
    pub submission_grace_ms: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let quiz_duration_secs = env::var("QUIZ_DURATION_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|secs| *secs > 0 && *secs <= MAX_QUIZ_DURATION_SECS)
            .unwrap_or(600);

        let submission_grace_ms = env::var("SUBMISSION_GRACE_MS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|ms| *ms >= 0)
            .unwrap_or(2_000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            bind_addr,
            quiz_duration_secs,
            submission_grace_ms,
        }
    }
}
