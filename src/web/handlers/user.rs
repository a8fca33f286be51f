use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{User, UserUpdateRequest};
use crate::web::extractors::{AppJson, AuthUser};
use crate::web::AppState;

pub async fn get_user(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(request): AppJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("Name is required"))?;

    Ok(Json(state.database.update_user_name(user.id, name).await?))
}

pub async fn delete_user(State(state): State<AppState>, AuthUser(user): AuthUser) -> AppResult<StatusCode> {
    state.database.delete_user(user.id).await?;
    info!("User {} deleted their account", user.id);
    Ok(StatusCode::NO_CONTENT)
}
