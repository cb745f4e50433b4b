// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::quiz::fetch_quiz,
    leaderboard::{fetch_leaderboard, rank_by_score},
    models::quiz_attempt::LeaderboardResponse,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// `score` ranks entries; anything else keeps append order.
    pub sort: Option<String>,
}

/// Leaderboard of a quiz with participant usernames resolved.
pub async fn get_leaderboard(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("No leaderboard".to_string()),
            other => other,
        })?;

    let entries = fetch_leaderboard(&pool, quiz.id).await.map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let leaderboard = match params.sort.as_deref() {
        Some("score") => rank_by_score(entries),
        _ => entries,
    };

    Ok(Json(LeaderboardResponse {
        quiz_id: quiz.id,
        quiz_name: quiz.name,
        leaderboard,
    }))
}
