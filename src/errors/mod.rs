//! Centralized error handling for the batch prober
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed or empty job submissions
//! - **Not Found Errors**: unknown job identifiers
//! - **Repository Errors**: SQLite reads and writes, migrations
//! - **Probe Errors**: transport failures, folded into probe outcomes
//! - **Web Errors**: HTTP request decoding issues
//!
//! # Usage
//!
//! ```rust
//! use batch_prober::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Probe Results
pub type ProbeResult<T> = Result<T, ProbeError>;
