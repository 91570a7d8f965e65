use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::evaluator::EvaluateError;
use crate::extract::ExtractError;
use crate::pipeline::PipelineError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every failure kind maps to a distinct, stable `code` so the presentation
/// layer can show a specific message rather than a generic failure.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown or deleted job: {0}")]
    InvalidJob(Uuid),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error(transparent)]
    Evaluation(EvaluateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidJob(id) => AppError::InvalidJob(id),
            PipelineError::JobLookup(e) => AppError::Store(e),
            PipelineError::FailedExtraction(e) => AppError::Extraction(e),
            PipelineError::FailedEvaluation { source, .. } => AppError::Evaluation(source),
            PipelineError::FailedPersist(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InvalidJob(id) => (
                StatusCode::NOT_FOUND,
                "INVALID_JOB",
                format!("No active job with id {id}"),
            ),
            AppError::Extraction(e) => {
                let code = match e {
                    ExtractError::TooLarge { .. } => "FILE_TOO_LARGE",
                    ExtractError::InvalidFormat(_) => "INVALID_FORMAT",
                    ExtractError::Empty => "EMPTY_DOCUMENT",
                };
                let status = match e {
                    ExtractError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, code, e.to_string())
            }
            AppError::Evaluation(e) => match e {
                EvaluateError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "The AI service is throttling requests".to_string(),
                ),
                EvaluateError::ServiceUnavailable(msg) => {
                    tracing::error!("AI service unavailable: {msg}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "SERVICE_UNAVAILABLE",
                        "The AI service could not be reached".to_string(),
                    )
                }
                EvaluateError::MalformedResponse(msg) => {
                    // Contract defect, not a transient fault: logged, surfaced.
                    tracing::error!("Malformed AI response: {msg}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "MALFORMED_RESPONSE",
                        "The AI service returned an unexpected payload".to_string(),
                    )
                }
            },
            AppError::Store(e) => match e {
                StoreError::NotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("No active job with id {id}"),
                ),
                StoreError::InvalidScore(score) => {
                    tracing::error!("Store rejected match_score {score}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INVALID_SCORE",
                        "The evaluation produced an out-of-range score".to_string(),
                    )
                }
                StoreError::InvalidReference(id) => {
                    tracing::error!("Store rejected unknown job reference {id}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INVALID_REFERENCE",
                        "The evaluation referenced an unknown job".to_string(),
                    )
                }
                StoreError::Database(e) => {
                    tracing::error!("Database error: {e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "A database error occurred".to_string(),
                    )
                }
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_job_maps_to_404() {
        let response = AppError::Store(StoreError::NotFound(Uuid::new_v4())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_job_maps_to_404() {
        let response = AppError::InvalidJob(Uuid::new_v4()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rate_limited_maps_to_429() {
        let response = AppError::Evaluation(EvaluateError::RateLimited).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_out_of_range_score_maps_to_500() {
        let response = AppError::Store(StoreError::InvalidScore(1.5)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
