// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::{ADMIN_ACCOUNT, Config},
    error::AppError,
    models::{
        assignment::{Assignment, AssignmentDetail, CreateAssignmentRequest},
        question::{CreateQuestionRequest, PublicQuestion, Question},
        quiz::{CreateQuizRequest, Quiz, QuizDetail, QuizSummary},
        user::{User, UserSummary},
    },
    utils::{
        html::{clean_all, clean_html},
        jwt::Claims,
    },
};

/// Loads a quiz row or reports it as not found.
pub(crate) async fn fetch_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Authoring on an existing quiz is limited to its owner and admins.
fn ensure_can_author(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.is_admin() || claims.user_id()? == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the quiz owner may edit this quiz".to_string()))
    }
}

/// Lists every quiz with its owner's username.
pub async fn list_quizzes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            q.id, q.name, q.description, q.language, q.image, q.verified,
            q.duration_secs, q.created_by, q.created_at,
            u.username AS owner_username,
            (SELECT COUNT(*) FROM assignments WHERE quiz_id = q.id) AS assignment_count,
            (SELECT COUNT(*) FROM quiz_leaderboard WHERE quiz_id = q.id) AS leaderboard_size
        FROM quizzes q
        JOIN users u ON q.created_by = u.id
        ORDER BY q.id
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({ "success": true, "quiz": quizzes })))
}

/// Single quiz with its assignments but without questions.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;

    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let (leaderboard_size,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM quiz_leaderboard WHERE quiz_id = ?")
            .bind(quiz_id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(json!({
        "success": true,
        "quiz": quiz,
        "assignments": assignments,
        "leaderboardSize": leaderboard_size,
    })))
}

/// Assembles the full quiz for play. Answer keys are never included.
pub async fn load_quiz_detail(pool: &SqlitePool, quiz_id: i64) -> Result<QuizDetail, AppError> {
    let quiz = fetch_quiz(pool, quiz_id).await?;

    let owner = sqlx::query_as::<_, UserSummary>("SELECT id, username FROM users WHERE id = ?")
        .bind(quiz.created_by)
        .fetch_one(pool)
        .await?;

    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT q.*
        FROM questions q
        JOIN assignments a ON q.assignment_id = a.id
        WHERE a.quiz_id = ?
        ORDER BY q.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut by_assignment: HashMap<i64, Vec<PublicQuestion>> = HashMap::new();
    for question in questions {
        by_assignment
            .entry(question.assignment_id)
            .or_default()
            .push(PublicQuestion::from(question));
    }

    let assignments = assignments
        .into_iter()
        .map(|a| {
            let questions = by_assignment.remove(&a.id).unwrap_or_default();
            AssignmentDetail::new(a, questions)
        })
        .collect();

    Ok(QuizDetail {
        id: quiz.id,
        name: quiz.name,
        description: quiz.description,
        language: quiz.language,
        image: quiz.image,
        verified: quiz.verified,
        duration_secs: quiz.duration_secs,
        created_by: owner,
        assignments,
        created_at: quiz.created_at,
    })
}

/// Full quiz for play: nested assignments and questions, owner summary.
pub async fn get_complete_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz_detail(&pool, quiz_id).await?;
    Ok(Json(json!({ "success": true, "quiz": quiz })))
}

/// Authors a new quiz.
///
/// * The caller must be `createdBy` or an admin.
/// * The quiz is verified automatically when the creator is an admin.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !claims.is_admin() && claims.user_id()? != payload.created_by {
        return Err(AppError::Forbidden(
            "Cannot author a quiz on behalf of another user".to_string(),
        ));
    }

    let creator = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(payload.created_by)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::BadRequest("Creator does not exist".to_string()))?;

    let verified = creator.account_type == ADMIN_ACCOUNT;
    let duration_secs = payload.duration_secs.unwrap_or(config.quiz_duration_secs);

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes
            (name, description, language, image, verified, duration_secs, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(clean_html(&payload.name))
    .bind(clean_html(&payload.description))
    .bind(clean_html(&payload.language))
    .bind(&payload.image)
    .bind(verified)
    .bind(duration_secs)
    .bind(creator.id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Quiz {} created by user {} (verified: {})",
        quiz.id,
        creator.id,
        quiz.verified
    );

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "quiz": quiz }))))
}

/// Appends an assignment to a quiz.
pub async fn create_assignment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    payload: Result<Json<CreateAssignmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = fetch_quiz(&pool, quiz_id).await?;
    ensure_can_author(&claims, quiz.created_by)?;

    let instructions = payload.instructions.as_deref().map(|lines| SqlJson(clean_all(lines)));

    let assignment = sqlx::query_as::<_, Assignment>(
        r#"
        INSERT INTO assignments (quiz_id, name, description, instructions, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(quiz.id)
    .bind(clean_html(&payload.name))
    .bind(clean_html(&payload.description))
    .bind(instructions)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create assignment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "assignment": assignment })),
    ))
}

/// Appends a question to an assignment.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(assignment_id): Path<i64>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if !payload.answer_is_an_option() {
        return Err(AppError::BadRequest(
            "Answer must be one of the options".to_string(),
        ));
    }

    let owner: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT q.created_by
        FROM assignments a
        JOIN quizzes q ON a.quiz_id = q.id
        WHERE a.id = ?
        "#,
    )
    .bind(assignment_id)
    .fetch_optional(&pool)
    .await?;
    let (owner_id,) = owner.ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;
    ensure_can_author(&claims, owner_id)?;

    // Options and answer are stored verbatim: grading compares them as text.
    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (assignment_id, question, options, answer, points, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(assignment_id)
    .bind(clean_html(&payload.question))
    .bind(SqlJson(&payload.options))
    .bind(&payload.answer)
    .bind(payload.points)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "question": question })),
    ))
}
