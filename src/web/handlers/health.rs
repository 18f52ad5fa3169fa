//! Health check HTTP handler

use axum::{extract::State, response::Response};
use tracing::warn;

use crate::web::{
    responses::{ok, HealthResponse},
    AppState,
};

/// Health check endpoint
///
/// Reports the service as healthy only when the database answers a ping.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = match state.database.ping().await {
        Ok(()) => HealthResponse::healthy(),
        Err(e) => {
            warn!("Health check database ping failed: {}", e);
            HealthResponse::unhealthy("Database connection failed".to_string())
        }
    };

    ok(response)
}
