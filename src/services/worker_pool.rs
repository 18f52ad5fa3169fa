//! Bounded fan-out/fan-in worker pool
//!
//! A fixed set of worker tasks drains a shared intake queue, runs the
//! caller's processing function and pushes each result onto a shared output
//! queue. The caller consumes the output as a stream that yields results in
//! completion order and ends once every worker has exited.
//!
//! ```text
//!  feeder ──► intake ──► worker 1..N ──► output ──► caller stream
//! ```

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Number of threads the host can run in parallel (at least 1)
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Clamp a requested worker count into `1..=ceiling`
pub fn normalize_concurrency(requested: i64, ceiling: usize) -> usize {
    let ceiling = ceiling.max(1);
    if requested < 1 {
        1
    } else {
        (requested as u64).min(ceiling as u64) as usize
    }
}

/// Generic bounded-concurrency executor
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Pool sized from a caller-supplied value, bounded by the host parallelism
    pub fn new(requested: i64) -> Self {
        Self::with_ceiling(requested, host_parallelism())
    }

    /// Pool sized from a caller-supplied value, bounded by `ceiling`
    pub fn with_ceiling(requested: i64, ceiling: usize) -> Self {
        Self {
            workers: normalize_concurrency(requested, ceiling),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every item and stream the results back as they finish.
    ///
    /// Exactly one result is produced per item unless `cancel` fires, in which
    /// case the feeder stops, idle workers exit and the stream still ends.
    /// Dropping the returned stream also winds the workers down.
    pub fn run<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        cancel: CancellationToken,
        process: F,
    ) -> ReceiverStream<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let workers = self.workers;
        let (intake_tx, intake_rx) = mpsc::channel::<T>(workers);
        let (output_tx, output_rx) = mpsc::channel::<R>(workers);
        let intake_rx = Arc::new(Mutex::new(intake_rx));
        let process = Arc::new(process);

        for worker_id in 0..workers {
            let intake_rx = Arc::clone(&intake_rx);
            let output_tx = output_tx.clone();
            let process = Arc::clone(&process);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                loop {
                    let item = {
                        let mut intake = intake_rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            item = intake.recv() => item,
                        }
                    };

                    let Some(item) = item else {
                        break;
                    };

                    let result = process(item).await;
                    if output_tx.send(result).await.is_err() {
                        debug!("Worker {} stopping: result stream dropped", worker_id);
                        break;
                    }
                }
                trace!("Worker {} exited", worker_id);
            });
        }
        // Only worker clones remain, so the output closes when the last worker exits
        drop(output_tx);

        let total = items.len();
        tokio::spawn(async move {
            let mut sent = 0usize;
            for item in items {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Feeder cancelled after {}/{} items", sent, total);
                        break;
                    }
                    res = intake_tx.send(item) => {
                        if res.is_err() {
                            break;
                        }
                        sent += 1;
                    }
                }
            }
            trace!("Feeder closed intake after {} items", sent);
        });

        ReceiverStream::new(output_rx)
    }
}
