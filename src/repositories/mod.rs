//! Repository pattern implementation for data access
//!
//! The job pipeline only ever talks to the `JobStore` trait, so the SQLite
//! implementation can be swapped for test doubles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use batch_prober::repositories::{JobRepository, JobStore};
//!
//! async fn example(repo: impl JobStore, id: &str) {
//!     let job = repo.get_job_with_results(id).await?;
//! }
//! ```

pub mod job;
pub mod traits;

pub use job::JobRepository;
pub use traits::JobStore;
