use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobPatch, JobRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let title = req.title.trim();
    let description = req.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::Validation(
            "title and description must be non-empty".to_string(),
        ));
    }

    let job = state.store.create_job(title, description).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(state.store.get_job(id).await?))
}

/// PATCH /api/v1/jobs/:id
/// Edits overwrite the job in place; past evaluations keep referencing the
/// same id and are not rewritten.
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<JobRow>, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("nothing to update".to_string()));
    }
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty())
        || patch
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
    {
        return Err(AppError::Validation(
            "title and description must be non-empty".to_string(),
        ));
    }

    Ok(Json(state.store.update_job(id, &patch).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_job(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
