// src/leaderboard.rs

//! Append-only leaderboard and attempt-history sequences.
//!
//! Both tables carry a UNIQUE attempt id, so an append repeated against the
//! same attempt is a no-op. Ranking is computed when reading.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::quiz_attempt::{HistoryEntry, LeaderboardEntry};

pub async fn append_to_leaderboard(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    attempt_id: i64,
    appended_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO quiz_leaderboard (quiz_id, attempt_id, appended_at)
        VALUES (?, ?, ?)
        ON CONFLICT(attempt_id) DO NOTHING
        "#,
    )
    .bind(quiz_id)
    .bind(attempt_id)
    .bind(appended_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn append_to_history(
    conn: &mut SqliteConnection,
    user_id: i64,
    attempt_id: i64,
    appended_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_attempt_history (user_id, attempt_id, appended_at)
        VALUES (?, ?, ?)
        ON CONFLICT(attempt_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(attempt_id)
    .bind(appended_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Leaderboard of a quiz in append order, participant usernames resolved.
pub async fn fetch_leaderboard(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            l.position,
            a.id AS attempt_id,
            a.user_id,
            u.username,
            a.score,
            a.created_at
        FROM quiz_leaderboard l
        JOIN quiz_attempts a ON l.attempt_id = a.id
        JOIN users u ON a.user_id = u.id
        WHERE l.quiz_id = ?
        ORDER BY l.position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

/// Attempt history of a user in append order, quiz names resolved.
pub async fn fetch_history(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            h.position,
            a.id AS attempt_id,
            a.quiz_id,
            q.name AS quiz_name,
            a.score,
            a.created_at
        FROM user_attempt_history h
        JOIN quiz_attempts a ON h.attempt_id = a.id
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE h.user_id = ?
        ORDER BY h.position
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Orders entries by score, highest first. Ties keep append order.
/// Tied scores share a rank (1, 2, 2, 4).
pub fn rank_by_score(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));

    let mut previous: Option<(i64, usize)> = None;
    for (index, entry) in entries.iter_mut().enumerate() {
        let rank = match previous {
            Some((score, rank)) if score == entry.score => rank,
            _ => index + 1,
        };
        entry.rank = Some(rank);
        previous = Some((entry.score, rank));
    }

    entries
}
