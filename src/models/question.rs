// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub assignment_id: i64,

    /// The text content of the question.
    pub question: String,

    /// List of option strings, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// The correct option, stored as text rather than an index.
    pub answer: String,

    /// Points awarded for a correct answer. Always positive.
    pub points: i64,

    pub created_at: DateTime<Utc>,
}

/// DTO for sending a question to participants (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub points: i64,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options.0,
            points: q.points,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(range(min = 1, max = 1000))]
    pub points: i64,
}

impl CreateQuestionRequest {
    /// The key is compared by text at grading time, so it must be one of the options verbatim.
    pub fn answer_is_an_option(&self) -> bool {
        self.options.iter().any(|opt| opt == &self.answer)
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option_length"));
        }
    }
    Ok(())
}
