// src/grading.rs

//! Server-side grading: the only place a score is decided.
//!
//! Correctness is recomputed from the stored answer keys, never taken from the
//! client. The final score multiplies the raw points by the remaining time in
//! seconds: `floor(raw * remaining_ms / 1000)`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{error::AppError, leaderboard, models::quiz_attempt::QuizAttempt};

/// Answer key for one question of the quiz being graded.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKey {
    pub id: i64,
    pub answer: String,
    pub points: i64,
}

/// Aggregate outcome of comparing a submission with the answer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grade {
    pub raw_score: i64,
    pub correct_count: i64,
}

/// Textual form of a submitted answer. `None` means "not answered".
pub fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Compares each submitted answer against the keys of the quiz.
///
/// Entries whose key is not a question id of this quiz are skipped. Only the
/// canonical decimal form counts, so `"07"` or `"+7"` cannot grade question 7
/// a second time.
pub fn grade(answers: &HashMap<String, Value>, keys: &HashMap<i64, AnswerKey>) -> Grade {
    let mut grade = Grade::default();

    for (question_id, submitted) in answers {
        let Some(key) = parse_question_id(question_id).and_then(|id| keys.get(&id)) else {
            tracing::debug!("Skipping answer for unknown question {}", question_id);
            continue;
        };

        if answer_text(submitted).as_deref() == Some(key.answer.as_str()) {
            grade.raw_score += key.points;
            grade.correct_count += 1;
        }
    }

    grade
}

fn parse_question_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| id.to_string() == raw)
}

/// Clamps the client-reported remaining time into `[0, bound_ms]`.
/// Non-finite values count as zero.
pub fn effective_time_remaining(client_ms: f64, bound_ms: i64) -> f64 {
    if !client_ms.is_finite() {
        return 0.0;
    }
    client_ms.clamp(0.0, bound_ms.max(0) as f64)
}

/// `floor(raw_score * remaining_ms / 1000)`.
pub fn finalize_score(raw_score: i64, remaining_ms: f64) -> i64 {
    (raw_score as f64 * remaining_ms / 1000.0).floor() as i64
}

/// Loads the answer keys of every question that belongs to `quiz_id`.
pub async fn load_answer_keys(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<HashMap<i64, AnswerKey>, sqlx::Error> {
    let keys: Vec<AnswerKey> = sqlx::query_as(
        r#"
        SELECT q.id, q.answer, q.points
        FROM questions q
        JOIN assignments a ON q.assignment_id = a.id
        WHERE a.quiz_id = ?
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(|k| (k.id, k)).collect())
}

/// Values needed to persist one graded attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub user_id: i64,
    pub session_id: Option<String>,
    pub grade: Grade,
    pub score: i64,
    pub time_remaining_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of recording an attempt.
#[derive(Debug, Clone)]
pub enum Recorded {
    Created(QuizAttempt),
    /// The session was already graded; this is the earlier attempt.
    Duplicate(QuizAttempt),
}

impl Recorded {
    pub fn attempt(&self) -> &QuizAttempt {
        match self {
            Recorded::Created(attempt) | Recorded::Duplicate(attempt) => attempt,
        }
    }
}

pub async fn find_attempt_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<QuizAttempt>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM quiz_attempts WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

/// Creates the attempt and appends it to the quiz leaderboard and the user's
/// history in a single transaction.
///
/// A second attempt for the same session hits the UNIQUE index; the earlier
/// attempt is returned instead.
pub async fn record_attempt(pool: &SqlitePool, new: NewAttempt) -> Result<Recorded, AppError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts
            (quiz_id, user_id, session_id, score, raw_score, correct_count, time_remaining_ms, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new.quiz_id)
    .bind(new.user_id)
    .bind(&new.session_id)
    .bind(new.score)
    .bind(new.grade.raw_score)
    .bind(new.grade.correct_count)
    .bind(new.time_remaining_ms)
    .bind(new.created_at)
    .fetch_one(&mut *tx)
    .await;

    let attempt = match inserted {
        Ok(attempt) => attempt,
        Err(e) if is_unique_violation(&e) => {
            tx.rollback().await?;
            let session_id = new.session_id.as_deref().unwrap_or_default();
            let existing = find_attempt_by_session(pool, session_id)
                .await?
                .ok_or_else(|| AppError::InternalServerError(e.to_string()))?;
            tracing::warn!(
                "Duplicate submission for session {}; returning attempt {}",
                session_id,
                existing.id
            );
            return Ok(Recorded::Duplicate(existing));
        }
        Err(e) => return Err(e.into()),
    };

    leaderboard::append_to_leaderboard(&mut *tx, attempt.quiz_id, attempt.id, attempt.created_at)
        .await?;
    leaderboard::append_to_history(&mut *tx, attempt.user_id, attempt.id, attempt.created_at)
        .await?;

    tx.commit().await?;

    Ok(Recorded::Created(attempt))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}
