//! Job coordination
//!
//! Entry point for job submissions: validates and persists the job, then
//! runs the pool → probe → aggregator pipeline in the background, detached
//! from the request that created it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::aggregator::{AggregateSummary, ResultAggregator, TargetOutcome};
use super::prober::Prober;
use super::worker_pool::{host_parallelism, WorkerPool};
use crate::config::JobsConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{CancelResponse, CheckRequest, CheckResponse, Job, JobView};
use crate::repositories::JobStore;

/// Settings the coordinator applies to every job
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub default_timeout_ms: u64,
    /// Upper bound on workers per job
    pub concurrency_ceiling: usize,
}

impl CoordinatorSettings {
    pub fn from_config(config: &JobsConfig) -> Self {
        let host = host_parallelism();
        Self {
            default_timeout_ms: config.default_timeout_ms,
            concurrency_ceiling: config.max_concurrency.map_or(host, |max| max.min(host)),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&JobsConfig::default())
    }
}

#[derive(Clone)]
pub struct JobCoordinator {
    store: Arc<dyn JobStore>,
    prober: Prober,
    settings: CoordinatorSettings,
    shutdown: CancellationToken,
    active: Arc<RwLock<HashMap<String, CancellationToken>>>,
    tracker: TaskTracker,
}

impl JobCoordinator {
    pub fn new(store: Arc<dyn JobStore>, prober: Prober, settings: CoordinatorSettings) -> Self {
        Self {
            store,
            prober,
            settings,
            shutdown: CancellationToken::new(),
            active: Arc::new(RwLock::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    /// Accept a batch check and start probing in the background.
    ///
    /// Returns as soon as the pending job row is stored; poll `retrieve` for
    /// progress.
    pub async fn check(&self, request: CheckRequest) -> AppResult<CheckResponse> {
        request.validate()?;
        if self.shutdown.is_cancelled() {
            return Err(AppError::internal("job coordinator is shutting down"));
        }

        let accepted_at = Instant::now();
        let job = Job::new();
        self.store.create_job(&job).await?;

        let pool = WorkerPool::with_ceiling(request.concurrency, self.settings.concurrency_ceiling);
        let timeout = Duration::from_millis(request.effective_timeout_ms(self.settings.default_timeout_ms));
        info!(
            "Job {} accepted: {} targets, {} workers, timeout {:?}",
            job.id,
            request.urls.len(),
            pool.workers(),
            timeout
        );

        let token = self.shutdown.child_token();
        self.active.write().await.insert(job.id.clone(), token.clone());

        let response = CheckResponse::from(&job);
        let coordinator = self.clone();
        self.tracker.spawn(async move {
            let job_id = job.id.clone();
            let summary = coordinator
                .execute(job, request.urls, pool, timeout, accepted_at, token)
                .await;
            coordinator.active.write().await.remove(&job_id);
            debug!("Job {} pipeline finished: {:?}", job_id, summary);
        });

        Ok(response)
    }

    async fn execute(
        &self,
        job: Job,
        urls: Vec<String>,
        pool: WorkerPool,
        timeout: Duration,
        accepted_at: Instant,
        cancel: CancellationToken,
    ) -> AggregateSummary {
        let expected = urls.len();
        let prober = self.prober.clone();
        let probe_cancel = cancel.clone();

        let outcomes = pool.run(urls, cancel.clone(), move |url: String| {
            let prober = prober.clone();
            let cancel = probe_cancel.clone();
            async move {
                let outcome = prober.probe(&url, timeout, &cancel).await;
                TargetOutcome { url, outcome }
            }
        });

        ResultAggregator::new(
            Arc::clone(&self.store),
            job,
            expected,
            accepted_at,
            pool.workers(),
        )
        .consume(outcomes, &cancel)
        .await
    }

    /// Read a job and every result persisted for it so far
    pub async fn retrieve(&self, job_id: &str) -> AppResult<JobView> {
        let job = self
            .store
            .get_job_with_results(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("job", job_id))?;
        Ok(JobView::from(job))
    }

    /// Signal a running job to stop probing and finalize early
    pub async fn cancel(&self, job_id: &str) -> AppResult<CancelResponse> {
        if let Some(token) = self.active.read().await.get(job_id) {
            info!("Cancelling job {}", job_id);
            token.cancel();
            return Ok(CancelResponse {
                job_id: job_id.to_string(),
                cancelled: true,
            });
        }

        // Not running: either already finished or unknown
        self.retrieve(job_id).await?;
        Ok(CancelResponse {
            job_id: job_id.to_string(),
            cancelled: false,
        })
    }

    /// Remove a job and its results, stopping it first if still running
    pub async fn delete(&self, job_id: &str) -> AppResult<()> {
        if let Some(token) = self.active.read().await.get(job_id) {
            token.cancel();
        }
        if self.store.delete_job(job_id).await? {
            info!("Job {} deleted", job_id);
            Ok(())
        } else {
            Err(AppError::not_found("job", job_id))
        }
    }

    pub async fn is_active(&self, job_id: &str) -> bool {
        self.active.read().await.contains_key(job_id)
    }

    /// Cancel every running job and wait for their final writes
    pub async fn shutdown(&self) {
        let active = self.active.read().await.len();
        info!("Shutting down job coordinator ({} active jobs)", active);
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All job pipelines finished");
    }
}
