// src/models/quiz_attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Represents the 'quiz_attempts' table in the database.
/// A graded attempt is a fact record: it is never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub session_id: Option<String>,
    /// Final score after the time multiplier.
    pub score: i64,
    /// Sum of points for correct answers.
    pub raw_score: i64,
    pub correct_count: i64,
    /// Remaining time the score was computed with, after server clamping.
    pub time_remaining_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// DTO for submitting a quiz attempt.
///
/// Both `answers` and `time_remaining` are optional at the serde level so that
/// their absence surfaces as a validation error rather than a parse failure.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    /// Key: question id. Value: the selected option.
    pub answers: Option<HashMap<String, Value>>,
    /// Milliseconds left on the participant's countdown.
    pub time_remaining: Option<f64>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub success: bool,
    pub message: String,
    pub quiz_attempt: QuizAttempt,
    pub correct_count: i64,
    /// True when the session had already been graded and nothing new was created.
    pub duplicate: bool,
}

/// One row of a quiz leaderboard, in append order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub position: i64,
    pub attempt_id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    /// Filled only when the reader asks for a score ranking.
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub quiz_id: i64,
    pub quiz_name: String,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// One row of a user's attempt history, in append order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub position: i64,
    pub attempt_id: i64,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}
