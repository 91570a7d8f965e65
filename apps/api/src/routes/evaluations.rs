use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::analytics::{compute_stats, EvaluationStats, Period};
use crate::errors::AppError;
use crate::models::evaluation::EvaluationRow;
use crate::pipeline;
use crate::state::AppState;
use crate::store::EvaluationFilter;

/// POST /api/v1/jobs/:id/evaluations
/// Multipart upload: one `resume` file field (PDF). Runs the full pipeline
/// and returns the committed record.
pub async fn handle_create_evaluation(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<EvaluationRow>), AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("resume") {
            let filename = field
                .file_name()
                .unwrap_or("resume.pdf")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("missing 'resume' file field".to_string()))?;

    let row = pipeline::run(
        state.store.as_ref(),
        state.evaluator.as_ref(),
        &state.retry_policy,
        state.config.max_upload_bytes,
        job_id,
        &filename,
        &bytes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/evaluations?job_id=&from=&to=
pub async fn handle_list_evaluations(
    State(state): State<AppState>,
    Query(filter): Query<EvaluationFilter>,
) -> Result<Json<Vec<EvaluationRow>>, AppError> {
    Ok(Json(state.store.query_evaluations(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<Period>,
}

/// GET /api/v1/evaluations/stats?period=week|month|quarter|year
pub async fn handle_evaluation_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<EvaluationStats>, AppError> {
    let period = query.period.unwrap_or(Period::Month);
    let filter = EvaluationFilter {
        from: Some(period.start_from(Utc::now())),
        ..Default::default()
    };
    let rows = state.store.query_evaluations(&filter).await?;
    Ok(Json(compute_stats(&rows)))
}
