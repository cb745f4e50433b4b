// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::{
    config::MAX_QUIZ_DURATION_SECS,
    models::{assignment::AssignmentDetail, user::UserSummary},
};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub language: String,
    pub image: Option<String>,
    /// Set automatically when the author is an admin.
    pub verified: bool,
    /// Length of one attempt session in seconds.
    pub duration_secs: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Catalog listing row, joined with the owner's username.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub language: String,
    pub image: Option<String>,
    pub verified: bool,
    pub duration_secs: i64,
    pub created_by: i64,
    pub owner_username: String,
    pub assignment_count: i64,
    pub leaderboard_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Complete quiz for play: nested assignments and answer-free questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub language: String,
    pub image: Option<String>,
    pub verified: bool,
    pub duration_secs: i64,
    pub created_by: UserSummary,
    pub assignments: Vec<AssignmentDetail>,
    pub created_at: DateTime<Utc>,
}

impl QuizDetail {
    pub fn question_count(&self) -> usize {
        self.assignments.iter().map(|a| a.questions.len()).sum()
    }
}

/// DTO for authoring a quiz.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub created_by: i64,
    #[validate(length(min = 1, max = 50))]
    pub language: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub image: Option<String>,
    #[validate(range(min = 1, max = MAX_QUIZ_DURATION_SECS))]
    pub duration_secs: Option<i64>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
