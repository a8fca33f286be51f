//! Saved job endpoints
//!
//! Every handler works on the authenticated user's jobs only; a job that
//! belongs to someone else is reported as missing.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::errors::{AppError, AppResult};
use crate::models::{
    JobAction, JobActionOutcome, JobActionRequest, MessageResponse, NotesResponse, NotesUpdateRequest,
    SavedJob, SavedJobCreateRequest,
};
use crate::web::extractors::{AppJson, AppPath, AuthUser};
use crate::web::AppState;

fn job_not_found(id: &str) -> AppError {
    AppError::not_found("Job", id)
}

pub async fn list_jobs(State(state): State<AppState>, AuthUser(user): AuthUser) -> AppResult<Json<Vec<SavedJob>>> {
    Ok(Json(state.database.list_saved_jobs(user.id).await?))
}

pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(request): AppJson<SavedJobCreateRequest>,
) -> AppResult<Json<SavedJob>> {
    let job = request
        .validate()
        .ok_or_else(|| AppError::validation("Missing required fields"))?;

    Ok(Json(state.database.create_saved_job(user.id, job).await?))
}

pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(request): AppJson<JobActionRequest>,
) -> AppResult<Response> {
    let action: JobAction = request
        .action
        .as_str()
        .and_then(|action| action.parse().ok())
        .ok_or_else(|| AppError::validation("Invalid action"))?;

    match state.database.apply_job_action(user.id, &id, action).await? {
        Some(JobActionOutcome::Updated(job)) => Ok(Json(job).into_response()),
        Some(JobActionOutcome::Deleted) => Ok(Json(MessageResponse::new("Job deleted successfully")).into_response()),
        None => Err(job_not_found(&id)),
    }
}

pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<MessageResponse>> {
    if state.database.delete_saved_job(user.id, &id).await? {
        Ok(Json(MessageResponse::new("Job deleted successfully")))
    } else {
        Err(job_not_found(&id))
    }
}

pub async fn get_notes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<NotesResponse>> {
    let notes = state
        .database
        .get_notes(user.id, &id)
        .await?
        .ok_or_else(|| job_not_found(&id))?;

    Ok(Json(NotesResponse { notes }))
}

pub async fn update_notes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<String>,
    AppJson(request): AppJson<NotesUpdateRequest>,
) -> AppResult<Json<MessageResponse>> {
    let Value::String(notes) = request.notes else {
        return Err(AppError::validation("notes must be a string"));
    };
    let notes = Some(notes.trim()).filter(|n| !n.is_empty());

    if !state.database.set_notes(user.id, &id, notes).await? {
        return Err(job_not_found(&id));
    }

    Ok(Json(MessageResponse {
        message: "Notes updated successfully".to_string(),
        notes: Some(notes.map(str::to_string)),
    }))
}

pub async fn delete_notes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<String>,
) -> AppResult<Json<MessageResponse>> {
    if !state.database.clear_notes(user.id, &id).await? {
        return Err(job_not_found(&id));
    }

    Ok(Json(MessageResponse::new("Notes deleted successfully")))
}
