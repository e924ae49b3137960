// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{DEFAULT_LEADERBOARD_SIZE, MAX_LEADERBOARD_SIZE},
    error::AppError,
    models::quiz::{LeaderboardParams, PublicQuiz, Quiz, QuizRequest, QuizSummary},
    state::AppState,
    utils::{json::AppJson, jwt::Claims},
};

/// Lists published quizzes, newest first.
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let quizzes = state.quizzes.list_published_quizzes().await?;
    let summaries: Vec<QuizSummary> = quizzes.iter().map(QuizSummary::from).collect();
    Ok(Json(summaries))
}

/// Loads a quiz or fails with 404.
pub(crate) async fn load_quiz(state: &AppState, id: Uuid) -> Result<Quiz, AppError> {
    state
        .quizzes
        .find_quiz(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Returns a published quiz without its answer keys.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(&state, id).await?;
    if !quiz.is_published {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    Ok(Json(PublicQuiz::from(&quiz)))
}

/// Creates a quiz owned by the caller.
///
/// Returns the full document, answer keys included, since the caller authored them.
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<QuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let creator_id = claims.user_id()?;

    let quiz = Quiz::from_request(payload, creator_id, Utc::now());
    state.quizzes.insert_quiz(&quiz).await?;
    tracing::info!(quiz_id = %quiz.id, %creator_id, "Created quiz with {} questions", quiz.questions.len());

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Replaces a quiz's content. Creator or admin only.
///
/// Already graded attempts keep the score they were given.
pub async fn update_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<QuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut quiz = load_quiz(&state, id).await?;
    if !quiz.is_managed_by(user_id, claims.is_admin()) {
        return Err(AppError::Forbidden("You can only edit your own quizzes".to_string()));
    }

    quiz.apply(payload, Utc::now());
    if !state.quizzes.update_quiz(&quiz).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(Json(quiz))
}

/// Deletes a quiz and its attempts. Creator or admin only.
pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz = load_quiz(&state, id).await?;
    if !quiz.is_managed_by(user_id, claims.is_admin()) {
        return Err(AppError::Forbidden("You can only delete your own quizzes".to_string()));
    }

    if !state.quizzes.delete_quiz(id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tracing::info!(quiz_id = %id, %user_id, "Deleted quiz");

    Ok(StatusCode::NO_CONTENT)
}

/// Retrieves the best graded attempts of a quiz.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);

    let quiz = load_quiz(&state, id).await?;
    let leaderboard = state.attempts.leaderboard(quiz.id, limit).await?;

    Ok(Json(leaderboard))
}
