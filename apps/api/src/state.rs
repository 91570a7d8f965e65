use std::sync::Arc;

use crate::config::Config;
use crate::evaluator::Evaluator;
use crate::pipeline::RetryPolicy;
use crate::store::EvaluationStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Both collaborators sit behind traits so the AI provider and the storage
/// backend can be swapped or mocked without touching the handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EvaluationStore>,
    pub evaluator: Arc<dyn Evaluator>,
    pub retry_policy: RetryPolicy,
    pub config: Config,
}
