use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{error::AppError, leaderboard::fetch_history, utils::jwt::Claims};

/// The caller's attempt history, oldest first.
pub async fn my_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempts = fetch_history(&pool, user_id).await.map_err(|e| {
        tracing::error!("Failed to fetch attempt history: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "success": true,
        "userId": user_id,
        "quizAttempts": attempts,
    })))
}
