use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::evaluation::{EvaluationRow, NewEvaluation};
use crate::models::job::{JobPatch, JobRow};
use crate::store::{validate_score, EvaluationFilter, EvaluationStore, StoreError};

/// Postgres-backed store. Single-statement writes only: per-record
/// atomicity comes from the database, no cross-record transactions needed.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationStore for PgStore {
    async fn create_job(&self, title: &str, description: &str) -> Result<JobRow, StoreError> {
        let job = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job_descriptions (id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        info!(job_id = %job.id, title, "Created job description");
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> Result<JobRow, StoreError> {
        sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, active, created_at, updated_at
             FROM job_descriptions WHERE id = $1 AND active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn list_jobs(&self) -> Result<Vec<JobRow>, StoreError> {
        Ok(sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, active, created_at, updated_at
             FROM job_descriptions
             WHERE active
             ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_job(&self, id: Uuid, patch: &JobPatch) -> Result<JobRow, StoreError> {
        sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE job_descriptions
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1 AND active
            RETURNING id, title, description, active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE job_descriptions SET active = FALSE WHERE id = $1 AND active")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        info!(job_id = %id, "Soft-deleted job description");
        Ok(())
    }

    async fn append_evaluation(&self, new: NewEvaluation) -> Result<EvaluationRow, StoreError> {
        validate_score(new.match_score)?;

        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            INSERT INTO evaluations
                (id, job_id, resume_filename, decision, match_score,
                 justification, key_matches, missing_requirements)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, job_id, resume_filename, decision, match_score,
                      justification, key_matches, missing_requirements, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.job_id)
        .bind(&new.resume_filename)
        .bind(new.decision.as_str())
        .bind(new.match_score)
        .bind(&new.justification)
        .bind(&new.key_matches)
        .bind(&new.missing_requirements)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // 23503: foreign_key_violation — the job id has no row
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                StoreError::InvalidReference(new.job_id)
            }
            _ => StoreError::Database(e),
        })?;

        info!(
            evaluation_id = %row.id,
            job_id = %row.job_id,
            decision = %row.decision,
            "Appended evaluation record"
        );
        Ok(row)
    }

    async fn query_evaluations(
        &self,
        filter: &EvaluationFilter,
    ) -> Result<Vec<EvaluationRow>, StoreError> {
        Ok(sqlx::query_as::<_, EvaluationRow>(
            r#"
            SELECT id, job_id, resume_filename, decision, match_score,
                   justification, key_matches, missing_requirements, created_at
            FROM evaluations
            WHERE ($1::uuid IS NULL OR job_id = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.job_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?)
    }
}
