//! Request and response shapes for the jobs API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::job::{Job, JobResultStatus, JobStatus};
use crate::errors::{AppError, AppResult};

/// Body of a check submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub concurrency: i64,
    /// Per-target deadline; non-positive or missing values use the configured default
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<i64>,
}

impl CheckRequest {
    pub fn new<I, S>(urls: I, concurrency: i64, timeout_ms: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            concurrency,
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Reject submissions that must never create a job
    pub fn validate(&self) -> AppResult<()> {
        let mut details = HashMap::new();
        if self.urls.is_empty() {
            details.insert("urls".to_string(), "must not be empty".to_string());
        }
        if self.concurrency <= 0 {
            details.insert(
                "concurrency".to_string(),
                "must be greater than 0".to_string(),
            );
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation("Validation failed", details))
        }
    }

    pub fn effective_timeout_ms(&self, default_timeout_ms: u64) -> u64 {
        match self.timeout_ms {
            Some(ms) if ms > 0 => ms as u64,
            _ => default_timeout_ms,
        }
    }
}

/// Acknowledgment returned when a job is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for CheckResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultItem {
    pub url: String,
    pub latency_ms: i64,
    pub status: JobResultStatus,
}

/// A job and all results persisted for it so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: String,
    pub results: Vec<JobResultItem>,
    pub status: JobStatus,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        let results = job
            .results
            .into_iter()
            .map(|result| JobResultItem {
                url: result.url,
                latency_ms: result.latency_ms,
                status: result.status,
            })
            .collect();

        Self {
            job_id: job.id,
            results,
            status: job.status,
            duration_ms: job.duration_ms,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub job_id: String,
    /// Whether a running pipeline received the cancellation signal
    pub cancelled: bool,
}
