// src/models/assignment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'assignments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub quiz_id: i64,
    pub name: String,
    pub description: String,
    /// Ordered instruction lines, stored as a JSON array.
    pub instructions: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
}

/// Assignment as served for play, with its questions and derived max score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub instructions: Option<Vec<String>>,
    /// Sum of the point values of `questions`.
    pub maxscore: i64,
    pub questions: Vec<PublicQuestion>,
}

impl AssignmentDetail {
    pub fn new(assignment: Assignment, questions: Vec<PublicQuestion>) -> Self {
        let maxscore = questions.iter().map(|q| q.points).sum();
        Self {
            id: assignment.id,
            name: assignment.name,
            description: assignment.description,
            instructions: assignment.instructions.map(|json| json.0),
            maxscore,
            questions,
        }
    }
}

/// DTO for creating an assignment under a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(length(max = 50))]
    pub instructions: Option<Vec<String>>,
}
