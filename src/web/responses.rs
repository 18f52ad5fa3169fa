//! HTTP response types and utilities
//!
//! Every endpoint answers with the same envelope so clients can branch on
//! `success` before looking at `data` or `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

use crate::errors::{AppError, WebError};

/// Machine readable error descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error_with_details(
        code: &str,
        message: String,
        details: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
                details,
            }),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Error wrapper so handlers can return `Result<_, ApiErrorResponse>` and use `?`
#[derive(Debug)]
pub struct ApiErrorResponse(pub AppError);

impl From<AppError> for ApiErrorResponse {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<WebError> for ApiErrorResponse {
    fn from(error: WebError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        handle_error(self.0)
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, code, message, details) = match error {
        AppError::Validation { message, details } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION_ERROR",
            message,
            (!details.is_empty()).then_some(details),
        ),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{} with id '{}' not found", resource, id),
            None,
        ),
        AppError::Web(WebError::InvalidRequest { field, message }) => {
            let details = HashMap::from([(field, message.clone())]);
            (StatusCode::BAD_REQUEST, "BAD_REQUEST", message, Some(details))
        }
        other => {
            error!("Request failed: {}", other);
            let message = match other {
                AppError::Database(_) => "Database operation failed".to_string(),
                AppError::Repository(_) => "Data access failed".to_string(),
                AppError::Configuration { message } => format!("Configuration error: {}", message),
                AppError::Internal { message } => format!("Internal error: {}", message),
                _ => "Request processing failed".to_string(),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                message,
                None,
            )
        }
    };

    (status, Json(ApiResponse::error_with_details(code, message, details))).into_response()
}

/// Success response helpers
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn accepted<T: Serialize>(data: T) -> Response {
    (StatusCode::ACCEPTED, Json(ApiResponse::success(data))).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub database: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: "Service is running".to_string(),
            database: "connected".to_string(),
        }
    }

    pub fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message,
            database: "disconnected".to_string(),
        }
    }
}
