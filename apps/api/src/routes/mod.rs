pub mod evaluations;
pub mod health;
pub mod jobs;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Evaluations
        .route(
            "/api/v1/jobs/:id/evaluations",
            post(evaluations::handle_create_evaluation),
        )
        .route(
            "/api/v1/evaluations",
            get(evaluations::handle_list_evaluations),
        )
        .route(
            "/api/v1/evaluations/stats",
            get(evaluations::handle_evaluation_stats),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
