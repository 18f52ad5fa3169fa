//! Job repository implementation
//!
//! SQLite-backed persistence for jobs and their per-target results.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use super::traits::JobStore;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Job, JobResult};

/// Repository implementation for jobs
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Sqlite>,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn job_from_row(row: &SqliteRow) -> Result<Job, sqlx::Error> {
        Ok(Job {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            duration_ms: row.try_get("duration_ms")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            results: Vec::new(),
        })
    }

    fn result_from_row(row: &SqliteRow) -> Result<JobResult, sqlx::Error> {
        Ok(JobResult {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            url: row.try_get("url")?,
            status: row.try_get("status")?,
            latency_ms: row.try_get("latency_ms")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create_job(&self, job: &Job) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, status, duration_ms, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.status)
        .bind(job.duration_ms)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::query_failed("insert_job", e))?;

        Ok(())
    }

    async fn update_job(&self, job: &Job) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, duration_ms = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status)
        .bind(job.duration_ms)
        .bind(job.updated_at)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::query_failed("update_job", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::record_not_found("jobs", "id", job.id.clone()));
        }

        Ok(())
    }

    async fn create_job_result(&self, result: &JobResult) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO job_results (id, job_id, url, status, latency_ms, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.id)
        .bind(&result.job_id)
        .bind(&result.url)
        .bind(result.status)
        .bind(result.latency_ms)
        .bind(result.created_at)
        .bind(result.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::query_failed("insert_job_result", e))?;

        Ok(())
    }

    async fn get_job_with_results(&self, id: &str) -> RepositoryResult<Option<Job>> {
        let row = sqlx::query(
            "SELECT id, status, duration_ms, created_at, updated_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::query_failed("select_job", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut job =
            Self::job_from_row(&row).map_err(|e| RepositoryError::query_failed("map_job", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, job_id, url, status, latency_ms, created_at, updated_at
            FROM job_results
            WHERE job_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::query_failed("select_job_results", e))?;

        job.results = rows
            .iter()
            .map(Self::result_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::query_failed("map_job_result", e))?;

        Ok(Some(job))
    }

    async fn delete_job(&self, id: &str) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::query_failed("delete_job", e))?;

        Ok(result.rows_affected() > 0)
    }
}
