//! Reachability probing
//!
//! This module provides the bounded-time probe run for every target of a
//! job. The network call itself sits behind the `Pinger` trait; the
//! `Prober` races it against a deadline and a cancellation token and
//! classifies whatever resolves first.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::JobsConfig;
use crate::errors::{ProbeError, ProbeResult};
use crate::models::JobResultStatus;

/// A single network reachability check
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, url: &str) -> ProbeResult<()>;
}

/// HTTP GET based pinger
///
/// Any HTTP response counts as reachable, whatever its status code; only
/// transport failures are reported as errors.
#[derive(Clone)]
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &JobsConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(connect_timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(connect_timeout);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Pinger for HttpPinger {
    async fn ping(&self, url: &str) -> ProbeResult<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::transport(url, e))?;
        trace!("Ping {} answered with {}", url, response.status());
        Ok(())
    }
}

/// Classified result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered; latency is the wall-clock time to the answer
    Completed { latency_ms: u64 },
    /// The deadline elapsed first; latency is the configured timeout
    Timeout { latency_ms: u64 },
    Failed { reason: String },
}

impl ProbeOutcome {
    pub fn status(&self) -> JobResultStatus {
        match self {
            ProbeOutcome::Completed { .. } => JobResultStatus::Completed,
            ProbeOutcome::Timeout { .. } => JobResultStatus::Timeout,
            ProbeOutcome::Failed { .. } => JobResultStatus::Failed,
        }
    }

    /// Latency to persist; failures record 0
    pub fn latency_ms(&self) -> i64 {
        match self {
            ProbeOutcome::Completed { latency_ms } | ProbeOutcome::Timeout { latency_ms } => {
                i64::try_from(*latency_ms).unwrap_or(i64::MAX)
            }
            ProbeOutcome::Failed { .. } => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status().is_failure()
    }
}

/// Bounded-time probe executor
#[derive(Clone)]
pub struct Prober {
    pinger: Arc<dyn Pinger>,
}

impl Prober {
    pub fn new(pinger: Arc<dyn Pinger>) -> Self {
        Self { pinger }
    }

    /// Probe `url`, giving up after `timeout`.
    ///
    /// The ping runs as its own task and reports through a oneshot. When the
    /// deadline wins, that task is left running and its eventual answer is
    /// dropped with the receiver. Cancellation aborts it.
    pub async fn probe(
        &self,
        url: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProbeOutcome {
        let (done_tx, done_rx) = oneshot::channel();
        let pinger = Arc::clone(&self.pinger);
        let target = url.to_string();

        let started = Instant::now();
        let deadline = tokio::time::sleep(timeout);
        let ping = tokio::spawn(async move {
            let _ = done_tx.send(pinger.ping(&target).await);
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                ping.abort();
                debug!("Probe of {} cancelled", url);
                ProbeOutcome::Failed { reason: ProbeError::Cancelled.to_string() }
            }
            done = done_rx => match done {
                Ok(Ok(())) => ProbeOutcome::Completed {
                    latency_ms: started.elapsed().as_millis() as u64,
                },
                Ok(Err(e)) => {
                    debug!("Probe of {} failed: {}", url, e);
                    ProbeOutcome::Failed { reason: e.to_string() }
                }
                Err(_) => ProbeOutcome::Failed {
                    reason: "probe task ended without reporting".to_string(),
                },
            },
            _ = deadline => {
                debug!("Probe of {} timed out after {:?}", url, timeout);
                ProbeOutcome::Timeout { latency_ms: timeout.as_millis() as u64 }
            }
        }
    }
}
