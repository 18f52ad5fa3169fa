pub mod api;
pub mod job;

pub use api::{CancelResponse, CheckRequest, CheckResponse, JobResultItem, JobView};
pub use job::{Job, JobResult, JobResultStatus, JobStatus};
