//! Result Store — append-only persistence for jobs and evaluation records.
//!
//! The orchestrator and handlers only see the `EvaluationStore` trait;
//! `PgStore` is the production Postgres implementation. Every write is a
//! single statement, so each commit is all-or-nothing and readers never
//! observe a partially written record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::evaluation::{EvaluationRow, NewEvaluation};
use crate::models::job::{JobPatch, JobRow};

pub mod pg;

pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    /// The evaluation references a job id with no corresponding row.
    /// A contract violation when it comes out of the pipeline: the
    /// orchestrator resolved the job before evaluating.
    #[error("evaluation references unknown job {0}")]
    InvalidReference(Uuid),

    #[error("match_score {0} is outside [0, 1]")]
    InvalidScore(f64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Filter for reading back evaluation history. All fields optional;
/// an empty filter returns everything, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationFilter {
    pub job_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Range check enforced before any evaluation insert, shared by every
/// store implementation. NaN fails the range test as well.
pub fn validate_score(score: f64) -> Result<(), StoreError> {
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(StoreError::InvalidScore(score))
    }
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn create_job(&self, title: &str, description: &str) -> Result<JobRow, StoreError>;

    /// Active jobs only: a soft-deleted job reads as `NotFound` so no new
    /// evaluations can target it, while its existing records stand.
    async fn get_job(&self, id: Uuid) -> Result<JobRow, StoreError>;

    /// Active jobs, newest first, id as tie-breaker so the order is stable.
    async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError>;

    /// Overwrites title/description in place and bumps `updated_at`.
    async fn update_job(&self, id: Uuid, patch: &JobPatch) -> Result<JobRow, StoreError>;

    /// Soft delete: flips `active` off, keeps the row for referential
    /// integrity of past evaluations.
    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError>;

    /// Validates the record invariants, then commits it atomically.
    async fn append_evaluation(&self, new: NewEvaluation) -> Result<EvaluationRow, StoreError>;

    async fn query_evaluations(
        &self,
        filter: &EvaluationFilter,
    ) -> Result<Vec<EvaluationRow>, StoreError>;
}

/// In-memory store used by pipeline and analytics tests. Enforces the same
/// invariants as `PgStore` via the shared `validate_score` check.
#[cfg(test)]
pub(crate) mod mem {
    use std::sync::Mutex;

    use super::*;
    use crate::models::evaluation::Decision;

    #[derive(Default)]
    pub struct MemStore {
        inner: Mutex<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        jobs: Vec<JobRow>,
        evaluations: Vec<EvaluationRow>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn evaluation_count(&self) -> usize {
            self.inner.lock().unwrap().evaluations.len()
        }
    }

    #[async_trait]
    impl EvaluationStore for MemStore {
        async fn create_job(&self, title: &str, description: &str) -> Result<JobRow, StoreError> {
            let now = Utc::now();
            let job = JobRow {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: description.to_string(),
                active: true,
                created_at: now,
                updated_at: now,
            };
            self.inner.lock().unwrap().jobs.push(job.clone());
            Ok(job)
        }

        async fn get_job(&self, id: Uuid) -> Result<JobRow, StoreError> {
            self.inner
                .lock()
                .unwrap()
                .jobs
                .iter()
                .find(|j| j.id == id && j.active)
                .cloned()
                .ok_or(StoreError::NotFound(id))
        }

        async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
            let mut jobs: Vec<JobRow> = self
                .inner
                .lock()
                .unwrap()
                .jobs
                .iter()
                .filter(|j| j.active)
                .cloned()
                .collect();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
            Ok(jobs)
        }

        async fn update_job(&self, id: Uuid, patch: &JobPatch) -> Result<JobRow, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let job = inner
                .jobs
                .iter_mut()
                .find(|j| j.id == id && j.active)
                .ok_or(StoreError::NotFound(id))?;
            if let Some(title) = &patch.title {
                job.title = title.clone();
            }
            if let Some(description) = &patch.description {
                job.description = description.clone();
            }
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
            let mut inner = self.inner.lock().unwrap();
            let job = inner
                .jobs
                .iter_mut()
                .find(|j| j.id == id && j.active)
                .ok_or(StoreError::NotFound(id))?;
            job.active = false;
            Ok(())
        }

        async fn append_evaluation(&self, new: NewEvaluation) -> Result<EvaluationRow, StoreError> {
            validate_score(new.match_score)?;
            let mut inner = self.inner.lock().unwrap();
            if !inner.jobs.iter().any(|j| j.id == new.job_id) {
                return Err(StoreError::InvalidReference(new.job_id));
            }
            let row = EvaluationRow {
                id: Uuid::new_v4(),
                job_id: new.job_id,
                resume_filename: new.resume_filename,
                decision: new.decision.as_str().to_string(),
                match_score: new.match_score,
                justification: new.justification,
                key_matches: new.key_matches,
                missing_requirements: new.missing_requirements,
                created_at: Utc::now(),
            };
            inner.evaluations.push(row.clone());
            Ok(row)
        }

        async fn query_evaluations(
            &self,
            filter: &EvaluationFilter,
        ) -> Result<Vec<EvaluationRow>, StoreError> {
            let mut rows: Vec<EvaluationRow> = self
                .inner
                .lock()
                .unwrap()
                .evaluations
                .iter()
                .filter(|e| filter.job_id.map_or(true, |id| e.job_id == id))
                .filter(|e| filter.from.map_or(true, |t| e.created_at >= t))
                .filter(|e| filter.to.map_or(true, |t| e.created_at <= t))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }
    }

    /// Convenience for tests that need a record in place.
    pub fn sample_evaluation(job_id: Uuid, decision: Decision, score: f64) -> NewEvaluation {
        NewEvaluation {
            job_id,
            resume_filename: "resume.pdf".to_string(),
            decision,
            match_score: score,
            justification: "test".to_string(),
            key_matches: vec!["Rust".to_string()],
            missing_requirements: vec![],
        }
    }
}
