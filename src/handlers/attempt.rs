// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    grading::{self, GradingError},
    handlers::quiz::load_quiz,
    models::attempt::{
        Attempt, AttemptView, SubmitAttemptRequest, SubmitAttemptResponse, SubmittedAnswer,
    },
    state::AppState,
    utils::{json::AppJson, jwt::Claims},
};

const SAVE_RETRIES: usize = 3;

/// Loads an attempt and checks that the caller owns it (404, then 403).
async fn load_owned_attempt(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<Attempt, AppError> {
    let attempt = state
        .attempts
        .find_attempt(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user_id {
        return Err(AppError::Forbidden(
            "This attempt belongs to another user".to_string(),
        ));
    }
    Ok(attempt)
}

/// Starts a new attempt on a quiz.
///
/// Unpublished quizzes can only be attempted by their creator.
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz = load_quiz(&state, quiz_id).await?;
    if !quiz.is_published && quiz.creator_id != user_id {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let attempt = Attempt::start(user_id, quiz.id, Utc::now());
    state.attempts.insert_attempt(&attempt).await?;
    tracing::info!(attempt_id = %attempt.id, quiz_id = %quiz.id, %user_id, "Attempt started");

    Ok((StatusCode::CREATED, Json(AttemptView::from(&attempt))))
}

/// Lists the caller's attempts, newest first.
pub async fn list_my_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempts = state.attempts.list_attempts_for_user(user_id).await?;
    let views: Vec<AttemptView> = attempts.iter().map(AttemptView::from).collect();
    Ok(Json(views))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_owned_attempt(&state, id, claims.user_id()?).await?;
    Ok(Json(AttemptView::from(&attempt)))
}

/// Saves (or replaces) the answer to one question while the attempt is in progress.
///
/// The store write is compare-and-set on the previously saved answers; when a
/// concurrent save wins, the attempt is reloaded and the answer merged again.
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<SubmittedAnswer>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut attempt = load_owned_attempt(&state, id, user_id).await?;
    let quiz = load_quiz(&state, attempt.quiz_id).await?;

    for _ in 0..SAVE_RETRIES {
        let updated = grading::record_answer(&attempt, &quiz, &payload, Utc::now())?;
        if state.attempts.save_progress(&attempt, &updated).await? {
            return Ok(Json(AttemptView::from(&updated)));
        }
        tracing::debug!(attempt_id = %id, "Saved answers changed underneath, retrying");
        attempt = load_owned_attempt(&state, id, user_id).await?;
    }

    // record_answer reports a graded attempt; otherwise the races kept coming
    grading::record_answer(&attempt, &quiz, &payload, Utc::now())?;
    Err(AppError::Conflict(
        "Attempt is being updated concurrently, try again".to_string(),
    ))
}

/// Grades an attempt.
///
/// * Checks ownership (404 / 403).
/// * Merges the submitted answers over the saved ones and scores everything.
///   Past the time limit only the saved answers count.
/// * Commits only if the attempt is still in progress; a second submission
///   fails with 400 and leaves the stored score untouched.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_owned_attempt(&state, id, claims.user_id()?).await?;
    let quiz = load_quiz(&state, attempt.quiz_id).await?;

    let now = Utc::now();
    if !req.answers.is_empty() && grading::time_limit_exceeded(&attempt, &quiz, now) {
        tracing::info!(attempt_id = %id, "Late submission, grading saved answers only");
    }

    let graded = grading::grade_attempt(&attempt, &quiz, &req.answers, now)?;
    if !state.attempts.complete_attempt(&graded).await? {
        tracing::warn!(attempt_id = %id, "Concurrent submission rejected");
        return Err(GradingError::AlreadySubmitted.into());
    }

    tracing::info!(
        attempt_id = %graded.id,
        quiz_id = %quiz.id,
        total_score = graded.total_score,
        passed = graded.passed,
        "Attempt graded"
    );

    Ok(Json(SubmitAttemptResponse {
        attempt_id: graded.id,
        total_score: graded.total_score,
        passed: graded.passed,
        passing_score: quiz.passing_score,
        total_points: quiz.total_points,
        time_spent_seconds: graded.time_spent_seconds,
    }))
}

/// Per-question review of a graded attempt.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = load_owned_attempt(&state, id, claims.user_id()?).await?;
    if attempt.is_in_progress() {
        return Err(AppError::BadRequest(
            "Attempt has not been submitted yet".to_string(),
        ));
    }
    let quiz = load_quiz(&state, attempt.quiz_id).await?;

    Ok(Json(grading::review_attempt(&attempt, &quiz)))
}
