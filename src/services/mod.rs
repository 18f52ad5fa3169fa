//! Job execution services
//!
//! - [`worker_pool`]: generic bounded-concurrency executor
//! - [`prober`]: single-target reachability check with a deadline
//! - [`aggregator`]: folds probe outcomes into a job and persists them
//! - [`coordinator`]: accepts jobs and drives the pipeline in the background

pub mod aggregator;
pub mod coordinator;
pub mod prober;
pub mod worker_pool;

pub use aggregator::{AggregateSummary, ResultAggregator, TargetOutcome};
pub use coordinator::{CoordinatorSettings, JobCoordinator};
pub use prober::{HttpPinger, Pinger, ProbeOutcome, Prober};
pub use worker_pool::{host_parallelism, normalize_concurrency, WorkerPool};
