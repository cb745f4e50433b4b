// src/handlers/play.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    config::{Config, MAX_ANSWERS_PER_SUBMISSION},
    error::AppError,
    grading::{self, NewAttempt, Recorded},
    handlers::quiz::fetch_quiz,
    models::{
        quiz_attempt::{SubmitAttemptRequest, SubmitAttemptResponse},
        quiz_session::{QuizSession, SessionTicket},
    },
    utils::jwt::Claims,
};

/// Opens an attempt session.
///
/// The server records the start instant and fixes the deadline from the quiz
/// duration; the client counts down against that deadline.
pub async fn start_session(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let quiz = fetch_quiz(&pool, quiz_id).await?;

    let started_at = Utc::now();
    let deadline = started_at + Duration::seconds(quiz.duration_secs);

    let session = sqlx::query_as::<_, QuizSession>(
        r#"
        INSERT INTO quiz_sessions (id, quiz_id, user_id, started_at, deadline)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(quiz.id)
    .bind(user_id)
    .bind(started_at)
    .bind(deadline)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to open session: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "User {} opened session {} on quiz {} (deadline {})",
        user_id,
        session.id,
        quiz.id,
        session.deadline
    );

    Ok((StatusCode::CREATED, Json(SessionTicket::from(session))))
}

/// Grades a submission and records the attempt.
///
/// * `answers`, `timeRemaining` and `sessionId` must all be present.
/// * The client time is clamped to what the server knows is left: the
///   session deadline plus grace, capped at the session length.
/// * A session is graded at most once; a repeat returns the first attempt.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let (Some(answers), Some(time_remaining)) = (req.answers, req.time_remaining) else {
        tracing::warn!("Rejected submission for quiz {}: missing fields", quiz_id);
        return Err(AppError::BadRequest(
            "Both answers and timeRemaining are required".to_string(),
        ));
    };

    if answers.len() > MAX_ANSWERS_PER_SUBMISSION {
        return Err(AppError::BadRequest(format!(
            "At most {} answers may be submitted",
            MAX_ANSWERS_PER_SUBMISSION
        )));
    }

    let user_id = claims.user_id()?;
    let quiz = fetch_quiz(&pool, quiz_id).await?;
    let now = Utc::now();

    let Some(session_id) = req.session_id else {
        tracing::warn!("Rejected submission for quiz {}: no session", quiz.id);
        return Err(AppError::BadRequest("sessionId is required".to_string()));
    };

    let session = sqlx::query_as::<_, QuizSession>("SELECT * FROM quiz_sessions WHERE id = ?")
        .bind(&session_id)
        .fetch_optional(&pool)
        .await?
        .filter(|s| s.quiz_id == quiz.id && s.user_id == user_id)
        .ok_or_else(|| AppError::BadRequest("Unknown session for this quiz".to_string()))?;

    if let Some(existing) = grading::find_attempt_by_session(&pool, &session.id).await? {
        tracing::warn!(
            "Session {} already graded as attempt {}",
            session.id,
            existing.id
        );
        return Ok(Json(response(Recorded::Duplicate(existing))));
    }

    let bound_ms = session.remaining_bound_ms(now, config.submission_grace_ms);

    let effective_ms = grading::effective_time_remaining(time_remaining, bound_ms);
    if effective_ms < time_remaining {
        tracing::warn!(
            "Clamped timeRemaining for quiz {} from {}ms to {}ms",
            quiz.id,
            time_remaining,
            effective_ms
        );
    }

    let keys = grading::load_answer_keys(&pool, quiz.id).await?;
    let grade = grading::grade(&answers, &keys);
    let score = grading::finalize_score(grade.raw_score, effective_ms);

    let recorded = grading::record_attempt(
        &pool,
        NewAttempt {
            quiz_id: quiz.id,
            user_id,
            session_id: Some(session.id),
            grade,
            score,
            time_remaining_ms: effective_ms.floor() as i64,
            created_at: now,
        },
    )
    .await?;

    if let Recorded::Created(attempt) = &recorded {
        tracing::info!(
            "Attempt {} on quiz {} by user {}: raw {} -> score {}",
            attempt.id,
            attempt.quiz_id,
            attempt.user_id,
            attempt.raw_score,
            attempt.score
        );
    }

    Ok(Json(response(recorded)))
}

fn response(recorded: Recorded) -> SubmitAttemptResponse {
    let duplicate = matches!(recorded, Recorded::Duplicate(_));
    let attempt = recorded.attempt().clone();
    SubmitAttemptResponse {
        success: true,
        message: if duplicate {
            "Quiz already submitted".to_string()
        } else {
            "Quiz submitted successfully".to_string()
        },
        correct_count: attempt.correct_count,
        quiz_attempt: attempt,
        duplicate,
    }
}
