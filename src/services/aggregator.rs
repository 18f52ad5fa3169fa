//! Job result aggregation
//!
//! Drains the worker pool's outcome stream for one job, persists a result
//! row per outcome, keeps the failure tally and writes the final job verdict
//! once every result write has finished.

use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::prober::ProbeOutcome;
use crate::models::{Job, JobResult, JobStatus};
use crate::repositories::JobStore;

/// The outcome of probing one target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub url: String,
    pub outcome: ProbeOutcome,
}

/// What the aggregator decided for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub expected: usize,
    pub received: usize,
    pub failures: usize,
    pub duration_ms: i64,
    /// Whether the consume loop stopped on cancellation
    pub cancelled: bool,
}

pub struct ResultAggregator {
    store: Arc<dyn JobStore>,
    job: Job,
    expected: usize,
    started: Instant,
    running: AtomicBool,
    write_permits: Arc<Semaphore>,
}

impl ResultAggregator {
    /// `started` is the instant the job was accepted; `max_concurrent_writes`
    /// bounds how many result rows are written at once.
    pub fn new(
        store: Arc<dyn JobStore>,
        job: Job,
        expected: usize,
        started: Instant,
        max_concurrent_writes: usize,
    ) -> Self {
        Self {
            store,
            job,
            expected,
            started,
            running: AtomicBool::new(false),
            write_permits: Arc::new(Semaphore::new(max_concurrent_writes.max(1))),
        }
    }

    /// Consume `outcomes` until it ends, then finalize the job.
    ///
    /// Cancellation does not discard outcomes already emitted: they are still
    /// persisted and tallied, and only targets that never reported count as
    /// missing. The stream must end once `cancel` fires.
    pub async fn consume<S>(mut self, mut outcomes: S, cancel: &CancellationToken) -> AggregateSummary
    where
        S: Stream<Item = TargetOutcome> + Unpin,
    {
        let mut writes = JoinSet::new();
        let mut received = 0usize;
        let mut failures = 0usize;
        let mut cancelled = false;

        loop {
            // After cancellation the pool stops dispatching and in-flight probes
            // resolve at once, so the stream is drained to its end.
            let next = if cancelled {
                outcomes.next().await
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        info!("Job {} cancellation requested, draining outcomes", self.job.id);
                        continue;
                    }
                    next = outcomes.next() => next,
                }
            };
            let Some(TargetOutcome { url, outcome }) = next else {
                break;
            };

            received += 1;
            self.mark_running().await;

            if outcome.is_failure() {
                failures += 1;
                debug!(
                    "Job {} target {} counted as failure ({:?})",
                    self.job.id, url, outcome
                );
            }

            let result = JobResult::new(&self.job.id, &url, outcome.status(), outcome.latency_ms());
            let store = Arc::clone(&self.store);
            let permit = match Arc::clone(&self.write_permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            writes.spawn(async move {
                let _permit = permit;
                if let Err(e) = store.create_job_result(&result).await {
                    warn!(
                        "Failed to persist result for job {} url {}: {}",
                        result.job_id, result.url, e
                    );
                }
            });
        }
        drop(outcomes);

        if cancelled {
            info!(
                "Job {} cancelled after {}/{} outcomes",
                self.job.id, received, self.expected
            );
        }

        while let Some(joined) = writes.join_next().await {
            if let Err(e) = joined {
                warn!("Result write task for job {} aborted: {}", self.job.id, e);
            }
        }

        self.finalize(received, failures, cancelled).await
    }

    /// Flip the job to running exactly once, on the first outcome
    async fn mark_running(&mut self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if self.job.transition_to(JobStatus::Running) {
            info!("Job {} running", self.job.id);
            if let Err(e) = self.store.update_job(&self.job).await {
                warn!("Failed to persist running status for job {}: {}", self.job.id, e);
            }
        }
    }

    async fn finalize(mut self, received: usize, failures: usize, cancelled: bool) -> AggregateSummary {
        // Targets that never reported count against the job
        let missing = self.expected.saturating_sub(received);
        let status = if failures + missing >= self.expected {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        let duration_ms = self.started.elapsed().as_millis() as i64;

        if self.job.finalize(status, duration_ms) {
            match status {
                JobStatus::Failed => info!(
                    "Job {} failed: {} of {} targets failed or timed out in {}ms",
                    self.job.id,
                    failures + missing,
                    self.expected,
                    duration_ms
                ),
                _ => info!(
                    "Job {} completed: {} of {} targets failed or timed out in {}ms",
                    self.job.id, failures, self.expected, duration_ms
                ),
            }
            if let Err(e) = self.store.update_job(&self.job).await {
                error!(
                    "Failed to persist final status {} for job {}: {}",
                    status, self.job.id, e
                );
            }
        } else {
            warn!(
                "Job {} already in terminal status {}, final write skipped",
                self.job.id, self.job.status
            );
        }

        AggregateSummary {
            job_id: self.job.id,
            status: self.job.status,
            expected: self.expected,
            received,
            failures,
            duration_ms: self.job.duration_ms,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::errors::{RepositoryError, RepositoryResult};
    use crate::models::JobResultStatus;
    use crate::repositories::JobRepository;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tracing_test::traced_test;

    async fn store() -> Arc<JobRepository> {
        let database = Database::in_memory().await.unwrap();
        database.migrate().await.unwrap();
        Arc::new(JobRepository::new(database.pool()))
    }

    fn outcome(url: &str, outcome: ProbeOutcome) -> TargetOutcome {
        TargetOutcome {
            url: url.to_string(),
            outcome,
        }
    }

    /// Wraps a real store and fails selected writes
    struct FlakyStore {
        inner: Arc<JobRepository>,
        fail_results_for: Option<String>,
        fail_updates: bool,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn create_job(&self, job: &Job) -> RepositoryResult<()> {
            self.inner.create_job(job).await
        }

        async fn update_job(&self, job: &Job) -> RepositoryResult<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(RepositoryError::query_failed("update_job", "disk I/O error"));
            }
            self.inner.update_job(job).await
        }

        async fn create_job_result(&self, result: &JobResult) -> RepositoryResult<()> {
            if self.fail_results_for.as_deref() == Some(result.url.as_str()) {
                return Err(RepositoryError::query_failed("insert_job_result", "database is locked"));
            }
            self.inner.create_job_result(result).await
        }

        async fn get_job_with_results(&self, id: &str) -> RepositoryResult<Option<Job>> {
            self.inner.get_job_with_results(id).await
        }

        async fn delete_job(&self, id: &str) -> RepositoryResult<bool> {
            self.inner.delete_job(id).await
        }
    }

    #[tokio::test]
    async fn test_partial_success_completes_job() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let outcomes = futures::stream::iter(vec![
            outcome("http://a", ProbeOutcome::Completed { latency_ms: 50 }),
            outcome("http://b", ProbeOutcome::Timeout { latency_ms: 500 }),
        ]);
        let aggregator = ResultAggregator::new(store.clone(), job.clone(), 2, Instant::now(), 2);
        let summary = aggregator.consume(outcomes, &CancellationToken::new()).await;

        assert_eq!(summary.status, JobStatus::Completed);
        assert_eq!(summary.received, 2);
        assert_eq!(summary.failures, 1);
        assert!(!summary.cancelled);

        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.results.len(), 2);
        let b = stored.results.iter().find(|r| r.url == "http://b").unwrap();
        assert_eq!(b.status, JobResultStatus::Timeout);
        assert_eq!(b.latency_ms, 500);
    }

    #[tokio::test]
    async fn test_all_failures_fail_job() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let outcomes = futures::stream::iter(vec![
            outcome("http://bad1", ProbeOutcome::Failed { reason: "refused".into() }),
            outcome("http://bad2", ProbeOutcome::Timeout { latency_ms: 100 }),
        ]);
        let summary = ResultAggregator::new(store.clone(), job.clone(), 2, Instant::now(), 1)
            .consume(outcomes, &CancellationToken::new())
            .await;

        assert_eq!(summary.status, JobStatus::Failed);
        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        let bad1 = stored.results.iter().find(|r| r.url == "http://bad1").unwrap();
        assert_eq!(bad1.latency_ms, 0);
    }

    #[tokio::test]
    async fn test_duration_covers_time_since_acceptance() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let outcomes = futures::stream::iter(vec![outcome(
            "http://a",
            ProbeOutcome::Completed { latency_ms: 50 },
        )]);
        let summary = ResultAggregator::new(store.clone(), job, 1, started, 1)
            .consume(outcomes, &CancellationToken::new())
            .await;

        assert!(summary.duration_ms >= 60);
    }

    #[tokio::test]
    async fn test_running_transition_fires_once() {
        let inner = store().await;
        let flaky = Arc::new(FlakyStore {
            inner: inner.clone(),
            fail_results_for: None,
            fail_updates: false,
            updates: AtomicUsize::new(0),
        });
        let job = Job::new();
        flaky.create_job(&job).await.unwrap();

        let outcomes = futures::stream::iter(
            (0..5).map(|i| outcome(&format!("http://t{i}"), ProbeOutcome::Completed { latency_ms: 1 })),
        );
        ResultAggregator::new(flaky.clone(), job, 5, Instant::now(), 3)
            .consume(outcomes, &CancellationToken::new())
            .await;

        // One running write plus one final write
        assert_eq!(flaky.updates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_stream_fails_job_without_running() {
        let inner = store().await;
        let flaky = Arc::new(FlakyStore {
            inner,
            fail_results_for: None,
            fail_updates: false,
            updates: AtomicUsize::new(0),
        });
        let job = Job::new();
        flaky.create_job(&job).await.unwrap();

        let summary = ResultAggregator::new(flaky.clone(), job.clone(), 3, Instant::now(), 1)
            .consume(futures::stream::empty(), &CancellationToken::new())
            .await;

        assert_eq!(summary.status, JobStatus::Failed);
        assert_eq!(summary.received, 0);
        assert_eq!(flaky.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_result_write_failure_is_not_fatal() {
        let inner = store().await;
        let flaky = Arc::new(FlakyStore {
            inner: inner.clone(),
            fail_results_for: Some("http://a".to_string()),
            fail_updates: false,
            updates: AtomicUsize::new(0),
        });
        let job = Job::new();
        flaky.create_job(&job).await.unwrap();

        let outcomes = futures::stream::iter(vec![
            outcome("http://a", ProbeOutcome::Completed { latency_ms: 5 }),
            outcome("http://b", ProbeOutcome::Completed { latency_ms: 7 }),
        ]);
        let summary = ResultAggregator::new(flaky.clone(), job.clone(), 2, Instant::now(), 2)
            .consume(outcomes, &CancellationToken::new())
            .await;

        assert_eq!(summary.status, JobStatus::Completed);
        let stored = inner.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.results.len(), 1);
        assert_eq!(stored.results[0].url, "http://b");
        assert!(logs_contain("Failed to persist result"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_final_write_failure_leaves_stale_status() {
        let inner = store().await;
        let flaky = Arc::new(FlakyStore {
            inner: inner.clone(),
            fail_results_for: None,
            fail_updates: true,
            updates: AtomicUsize::new(0),
        });
        let job = Job::new();
        flaky.create_job(&job).await.unwrap();

        let outcomes = futures::stream::iter(vec![outcome(
            "http://a",
            ProbeOutcome::Completed { latency_ms: 5 },
        )]);
        let summary = ResultAggregator::new(flaky.clone(), job.clone(), 1, Instant::now(), 1)
            .consume(outcomes, &CancellationToken::new())
            .await;

        assert_eq!(summary.status, JobStatus::Completed);
        let stored = inner.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.results.len(), 1);
        assert!(logs_contain("Failed to persist final status"));
    }

    #[tokio::test]
    async fn test_cancellation_finalizes_with_missing_targets_as_failures() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcomes = futures::stream::empty::<TargetOutcome>();
        let summary = ResultAggregator::new(store.clone(), job.clone(), 4, Instant::now(), 2)
            .consume(outcomes, &cancel)
            .await;

        assert!(summary.cancelled);
        assert_eq!(summary.status, JobStatus::Failed);
        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_already_emitted_outcomes() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcomes = futures::stream::iter(vec![outcome(
            "http://a",
            ProbeOutcome::Completed { latency_ms: 5 },
        )]);
        let summary = ResultAggregator::new(store.clone(), job.clone(), 1, Instant::now(), 1)
            .consume(outcomes, &cancel)
            .await;

        assert!(summary.cancelled);
        assert_eq!(summary.received, 1);
        assert_eq!(summary.status, JobStatus::Completed);
        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.results.len(), 1);
        assert_eq!(stored.results[0].status, JobResultStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancellation_counts_only_undispatched_targets_as_missing() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcomes = futures::stream::iter(vec![
            outcome("http://a", ProbeOutcome::Completed { latency_ms: 5 }),
            outcome("http://b", ProbeOutcome::Failed { reason: "Probe cancelled".into() }),
        ]);
        let summary = ResultAggregator::new(store.clone(), job.clone(), 5, Instant::now(), 2)
            .consume(outcomes, &cancel)
            .await;

        // 1 failure + 3 never dispatched < 5 expected
        assert_eq!(summary.received, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.status, JobStatus::Completed);
        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.results.len(), 2);
    }

    #[tokio::test]
    async fn test_first_outcome_persists_running_status() {
        let store = store().await;
        let job = Job::new();
        store.create_job(&job).await.unwrap();

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let aggregator = ResultAggregator::new(store.clone(), job.clone(), 3, Instant::now(), 1);
        let cancel = CancellationToken::new();
        let consumer_cancel = cancel.clone();
        let consumer = tokio::spawn(async move {
            aggregator
                .consume(tokio_stream::wrappers::ReceiverStream::new(rx), &consumer_cancel)
                .await
        });

        tx.send(outcome("http://a", ProbeOutcome::Completed { latency_ms: 3 }))
            .await
            .unwrap();
        let mut status = JobStatus::Pending;
        for _ in 0..50 {
            status = store.get_job_with_results(&job.id).await.unwrap().unwrap().status;
            if status != JobStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, JobStatus::Running);
        assert!(!consumer.is_finished());

        cancel.cancel();
        drop(tx);
        let summary = consumer.await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.status, JobStatus::Completed);
        let stored = store.get_job_with_results(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }
}
