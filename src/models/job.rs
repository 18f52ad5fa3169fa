//! Job and job result entities
//!
//! A `Job` is one accepted batch-check request; each probed target produces
//! exactly one `JobResult`. Status strings are shared between the database
//! (TEXT columns) and the JSON surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Statuses only move forward; terminal statuses never change.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobResultStatus {
    Completed,
    Failed,
    Timeout,
}

impl JobResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobResultStatus::Completed => "completed",
            JobResultStatus::Failed => "failed",
            JobResultStatus::Timeout => "timeout",
        }
    }

    /// Timeouts and failures both count against the job verdict
    pub fn is_failure(&self) -> bool {
        !matches!(self, JobResultStatus::Completed)
    }
}

impl fmt::Display for JobResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub results: Vec<JobResult>,
}

impl Job {
    /// Create a new pending job with a fresh identifier
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            duration_ms: 0,
            created_at: now,
            updated_at: now,
            results: Vec::new(),
        }
    }

    /// Move the job forward to `next`, touching `updated_at`.
    ///
    /// Returns `false` and leaves the job untouched if the transition would
    /// go backwards or leave a terminal status.
    pub fn transition_to(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    /// Record the terminal status together with the total duration.
    pub fn finalize(&mut self, status: JobStatus, duration_ms: i64) -> bool {
        if !status.is_terminal() || !self.transition_to(status) {
            return false;
        }
        self.duration_ms = duration_ms;
        true
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: String,
    pub job_id: String,
    pub url: String,
    pub status: JobResultStatus,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobResult {
    pub fn new(job_id: &str, url: &str, status: JobResultStatus, latency_ms: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            url: url.to_string(),
            status,
            latency_ms,
            created_at: now,
            updated_at: now,
        }
    }
}
