// src/handlers/admin.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{error::AppError, state::AppState};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}
