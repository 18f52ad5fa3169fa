//! Error type definitions for the batch prober
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system. Only validation and not-found
//! errors ever reach a caller synchronously; everything raised inside a
//! background job pipeline is logged and absorbed.

use std::collections::HashMap;
use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all errors that can cross the service boundary.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Web layer errors
    #[error("Web error: {0}")]
    Web(#[from] WebError),

    /// Validation errors, with per-field details
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: HashMap<String, String>,
    },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// SQL query execution failures
    #[error("Query failed: {query} - {message}")]
    QueryFailed { query: String, message: String },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },

    /// Migration failures
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed { version: String, message: String },
}

/// Errors raised while probing a single target
///
/// These never propagate past the probe executor: they are folded into a
/// classified outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Transport-level failure (DNS, connect, TLS, reset, invalid URL)
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The probe was cancelled before it resolved
    #[error("Probe cancelled")]
    Cancelled,
}

/// Web layer specific errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Invalid request format
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error from a set of field errors
    pub fn validation<S: Into<String>>(message: S, details: HashMap<String, String>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    /// Create a query failed error
    pub fn query_failed<Q: Into<String>, M: ToString>(query: Q, message: M) -> Self {
        Self::QueryFailed {
            query: query.into(),
            message: message.to_string(),
        }
    }

    /// Create a record not found error
    pub fn record_not_found<T: Into<String>, F: Into<String>, V: Into<String>>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::RecordNotFound {
            table: table.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a migration failure for the given schema version
    pub fn migration_failed<M: ToString>(version: i64, message: M) -> Self {
        Self::MigrationFailed {
            version: version.to_string(),
            message: message.to_string(),
        }
    }
}

impl ProbeError {
    /// Create a transport error
    pub fn transport<U: Into<String>, M: ToString>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

impl WebError {
    /// Create an invalid request error
    pub fn invalid_request<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }
}
