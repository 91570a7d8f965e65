//! Evaluation Orchestrator — one linear pass per request:
//! resolve job → extract text → AI verdict (with retry) → append record.
//!
//! No shared mutable state between concurrent runs other than the store,
//! and the store commits each record in a single statement; a run aborted
//! before the append leaves nothing behind.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::evaluator::{EvaluateError, Evaluator, Verdict};
use crate::extract::{extract_text, ExtractError};
use crate::models::evaluation::{EvaluationRow, NewEvaluation};
use crate::store::{EvaluationStore, StoreError};

/// Bounded exponential backoff applied to transient AI-client failures
/// (`ServiceUnavailable`, `RateLimited`). `MalformedResponse` is a contract
/// defect and is never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 500ms, 1s, then give up
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown or deleted job {0}")]
    InvalidJob(Uuid),

    /// The job could not be resolved for an infrastructure reason, before
    /// any extraction or evaluation work started.
    #[error("job lookup failed: {0}")]
    JobLookup(StoreError),

    #[error("extraction failed: {0}")]
    FailedExtraction(#[from] ExtractError),

    #[error("evaluation failed after {attempts} attempt(s): {source}")]
    FailedEvaluation {
        attempts: u32,
        source: EvaluateError,
    },

    #[error("persist failed: {0}")]
    FailedPersist(StoreError),
}

/// Runs one evaluation end to end and returns the committed record.
///
/// Stage failures map 1:1 onto `PipelineError` variants with the
/// originating kind preserved, so callers can surface a specific message.
pub async fn run(
    store: &dyn EvaluationStore,
    evaluator: &dyn Evaluator,
    policy: &RetryPolicy,
    max_upload_bytes: usize,
    job_id: Uuid,
    resume_filename: &str,
    resume_bytes: &[u8],
) -> Result<EvaluationRow, PipelineError> {
    // Received: the job must exist (and not be soft-deleted) before any
    // work is spent on the upload.
    let job = store.get_job(job_id).await.map_err(|e| match e {
        StoreError::NotFound(id) => PipelineError::InvalidJob(id),
        other => PipelineError::JobLookup(other),
    })?;

    // Extracted: no downstream calls on failure.
    let resume_text = extract_text(resume_bytes, max_upload_bytes)?;
    info!(
        %job_id,
        resume_filename,
        chars = resume_text.len(),
        "Extracted resume text"
    );

    // Evaluated.
    let verdict = evaluate_with_retry(evaluator, policy, &job.description, &resume_text).await?;

    // Stored. A validation failure here means an earlier stage misbehaved:
    // logged as a defect and surfaced, never retried.
    let record = NewEvaluation {
        job_id,
        resume_filename: resume_filename.to_string(),
        decision: verdict.decision,
        match_score: verdict.match_score,
        justification: verdict.justification,
        key_matches: verdict.key_matches,
        missing_requirements: verdict.missing_requirements,
    };
    let row = store.append_evaluation(record).await.map_err(|e| {
        error!(%job_id, error = %e, "Persist stage rejected evaluation record");
        PipelineError::FailedPersist(e)
    })?;

    info!(evaluation_id = %row.id, %job_id, decision = %row.decision, "Evaluation done");
    Ok(row)
}

async fn evaluate_with_retry(
    evaluator: &dyn Evaluator,
    policy: &RetryPolicy,
    job_text: &str,
    resume_text: &str,
) -> Result<Verdict, PipelineError> {
    let mut last_error: Option<EvaluateError> = None;

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let delay = policy.base_delay * (1 << (attempt - 1));
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Transient AI failure, backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }

        match evaluator.evaluate(job_text, resume_text).await {
            Ok(verdict) => return Ok(verdict),
            Err(e) if e.is_transient() => last_error = Some(e),
            Err(e) => {
                return Err(PipelineError::FailedEvaluation {
                    attempts: attempt + 1,
                    source: e,
                })
            }
        }
    }

    Err(PipelineError::FailedEvaluation {
        attempts: policy.max_attempts,
        source: last_error
            .unwrap_or_else(|| EvaluateError::ServiceUnavailable("no attempts made".into())),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::extract::minimal_pdf;
    use crate::models::evaluation::Decision;
    use crate::models::job::{JobPatch, JobRow};
    use crate::store::mem::MemStore;
    use crate::store::EvaluationFilter;

    const MAX_BYTES: usize = 10 * 1024 * 1024;

    /// Test evaluator that pops scripted outcomes and records its inputs.
    struct ScriptedEvaluator {
        script: Mutex<VecDeque<Result<Verdict, EvaluateError>>>,
        calls: AtomicUsize,
        seen_jobs: Mutex<Vec<String>>,
    }

    impl ScriptedEvaluator {
        fn new(script: Vec<Result<Verdict, EvaluateError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                seen_jobs: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Evaluator for ScriptedEvaluator {
        async fn evaluate(
            &self,
            job_text: &str,
            _resume_text: &str,
        ) -> Result<Verdict, EvaluateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_jobs.lock().unwrap().push(job_text.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("evaluator called more times than scripted")
        }
    }

    fn shortlist_verdict() -> Verdict {
        Verdict {
            decision: Decision::Shortlist,
            match_score: 0.92,
            justification: "strong match".to_string(),
            key_matches: vec!["Go".to_string(), "SQL".to_string()],
            missing_requirements: vec![],
        }
    }

    fn service_unavailable() -> EvaluateError {
        EvaluateError::ServiceUnavailable("connect timeout".to_string())
    }

    #[tokio::test]
    async fn test_shortlist_scenario_stores_one_record() {
        let store = MemStore::new();
        let job = store
            .create_job("Engineer", "Needs Go and SQL")
            .await
            .unwrap();
        let evaluator = ScriptedEvaluator::new(vec![Ok(shortlist_verdict())]);
        let pdf = minimal_pdf("5 years Go, SQL expert");

        let row = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "candidate.pdf",
            &pdf,
        )
        .await
        .unwrap();

        assert_eq!(row.job_id, job.id);
        assert_eq!(row.decision, "shortlist");
        assert_eq!(row.match_score, 0.92);
        assert_eq!(store.evaluation_count(), 1);
        // The evaluator saw the job description, not some other text.
        assert_eq!(
            evaluator.seen_jobs.lock().unwrap().as_slice(),
            ["Needs Go and SQL"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_timeouts_fail_evaluation_without_record() {
        let store = MemStore::new();
        let job = store.create_job("Engineer", "desc").await.unwrap();
        let evaluator = ScriptedEvaluator::new(vec![
            Err(service_unavailable()),
            Err(service_unavailable()),
            Err(service_unavailable()),
        ]);
        let pdf = minimal_pdf("resume text");

        let result = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "candidate.pdf",
            &pdf,
        )
        .await;

        match result {
            Err(PipelineError::FailedEvaluation { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, EvaluateError::ServiceUnavailable(_)));
            }
            other => panic!("expected FailedEvaluation, got {other:?}"),
        }
        assert_eq!(evaluator.call_count(), 3);
        assert_eq!(store.evaluation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_then_success_recovers() {
        let store = MemStore::new();
        let job = store.create_job("Engineer", "desc").await.unwrap();
        let evaluator = ScriptedEvaluator::new(vec![
            Err(EvaluateError::RateLimited),
            Ok(shortlist_verdict()),
        ]);
        let pdf = minimal_pdf("resume text");

        let row = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "candidate.pdf",
            &pdf,
        )
        .await
        .unwrap();

        assert_eq!(row.decision, "shortlist");
        assert_eq!(evaluator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let store = MemStore::new();
        let job = store.create_job("Engineer", "desc").await.unwrap();
        let evaluator = ScriptedEvaluator::new(vec![Err(EvaluateError::MalformedResponse(
            "unexpected shape".to_string(),
        ))]);
        let pdf = minimal_pdf("resume text");

        let result = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "candidate.pdf",
            &pdf,
        )
        .await;

        match result {
            Err(PipelineError::FailedEvaluation { attempts, source }) => {
                assert_eq!(attempts, 1);
                assert!(matches!(source, EvaluateError::MalformedResponse(_)));
            }
            other => panic!("expected FailedEvaluation, got {other:?}"),
        }
        assert_eq!(evaluator.call_count(), 1);
        assert_eq!(store.evaluation_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_byte_upload_fails_extraction_before_any_call() {
        let store = MemStore::new();
        let job = store.create_job("Engineer", "desc").await.unwrap();
        let evaluator = ScriptedEvaluator::new(vec![]);

        let result = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "empty.pdf",
            &[],
        )
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::FailedExtraction(ExtractError::Empty))
        ));
        assert_eq!(evaluator.call_count(), 0);
        assert_eq!(store.evaluation_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_score_surfaces_as_failed_persist() {
        let store = MemStore::new();
        let job = store.create_job("Engineer", "desc").await.unwrap();
        let mut verdict = shortlist_verdict();
        verdict.match_score = 1.5;
        let evaluator = ScriptedEvaluator::new(vec![Ok(verdict)]);
        let pdf = minimal_pdf("resume text");

        let result = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            job.id,
            "candidate.pdf",
            &pdf,
        )
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::FailedPersist(StoreError::InvalidScore(_)))
        ));
        assert_eq!(store.evaluation_count(), 0);
    }

    /// Store whose job lookup fails at the infrastructure level. Nothing
    /// past the lookup should ever be reached.
    struct UnreachableStore;

    #[async_trait]
    impl EvaluationStore for UnreachableStore {
        async fn create_job(&self, _: &str, _: &str) -> Result<JobRow, StoreError> {
            unreachable!()
        }

        async fn get_job(&self, _: Uuid) -> Result<JobRow, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
            unreachable!()
        }

        async fn update_job(&self, _: Uuid, _: &JobPatch) -> Result<JobRow, StoreError> {
            unreachable!()
        }

        async fn delete_job(&self, _: Uuid) -> Result<(), StoreError> {
            unreachable!()
        }

        async fn append_evaluation(&self, _: NewEvaluation) -> Result<EvaluationRow, StoreError> {
            unreachable!()
        }

        async fn query_evaluations(
            &self,
            _: &EvaluationFilter,
        ) -> Result<Vec<EvaluationRow>, StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_lookup_infrastructure_failure_is_not_a_persist_failure() {
        let evaluator = ScriptedEvaluator::new(vec![]);
        let pdf = minimal_pdf("resume text");

        let result = run(
            &UnreachableStore,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            Uuid::new_v4(),
            "candidate.pdf",
            &pdf,
        )
        .await;

        match result {
            Err(PipelineError::JobLookup(StoreError::Database(_))) => {}
            other => panic!("expected JobLookup, got {other:?}"),
        }
        assert_eq!(evaluator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_rejected_before_extraction() {
        let store = MemStore::new();
        let evaluator = ScriptedEvaluator::new(vec![]);
        let pdf = minimal_pdf("resume text");

        let result = run(
            &store,
            &evaluator,
            &RetryPolicy::default(),
            MAX_BYTES,
            Uuid::new_v4(),
            "candidate.pdf",
            &pdf,
        )
        .await;

        assert!(matches!(result, Err(PipelineError::InvalidJob(_))));
        assert_eq!(evaluator.call_count(), 0);
    }
}
