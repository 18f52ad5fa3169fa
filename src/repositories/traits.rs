//! Repository trait definitions

use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::models::{Job, JobResult};

/// Persistence contract for jobs and their results
///
/// Every call stands alone: there is no transaction spanning several calls,
/// so a job pipeline may leave a job whose durable status lags behind the
/// results already written.
///
/// # Examples
///
/// ```rust,ignore
/// async fn example(store: &dyn JobStore, job: &Job) -> RepositoryResult<()> {
///     store.create_job(job).await?;
///     let stored = store.get_job_with_results(&job.id).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job row. The job's `results` are ignored.
    async fn create_job(&self, job: &Job) -> RepositoryResult<()>;

    /// Overwrite status, duration and timestamps of an existing job
    ///
    /// Idempotent: writing the same job twice leaves the same row.
    async fn update_job(&self, job: &Job) -> RepositoryResult<()>;

    /// Insert one result row for an existing job
    async fn create_job_result(&self, result: &JobResult) -> RepositoryResult<()>;

    /// Read a job together with every result persisted for it
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Job))` - Job found, `results` populated in insertion order
    /// * `Ok(None)` - No job with that id
    /// * `Err(RepositoryError)` - Database or mapping error
    async fn get_job_with_results(&self, id: &str) -> RepositoryResult<Option<Job>>;

    /// Delete a job and, by cascade, its results. Returns whether a row existed.
    async fn delete_job(&self, id: &str) -> RepositoryResult<bool>;
}
