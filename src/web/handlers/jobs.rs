//! Job HTTP handlers
//!
//! Thin adapters over [`JobCoordinator`](crate::services::JobCoordinator):
//! extract, delegate, wrap the answer in the response envelope.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use tracing::debug;

use crate::errors::WebError;
use crate::models::CheckRequest;
use crate::web::{
    responses::{accepted, no_content, ok, ApiErrorResponse},
    AppState,
};

type HandlerResult = Result<Response, ApiErrorResponse>;

/// Submit a batch of URLs for checking
pub async fn check_urls(
    State(state): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> HandlerResult {
    let Json(request) =
        payload.map_err(|rejection| WebError::invalid_request("body", rejection.body_text()))?;
    debug!(
        "Check request with {} urls, concurrency {}",
        request.urls.len(),
        request.concurrency
    );

    let response = state.coordinator.check(request).await?;
    Ok(accepted(response))
}

/// Get a job with the results recorded so far
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let view = state.coordinator.retrieve(&id).await?;
    Ok(ok(view))
}

pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let response = state.coordinator.cancel(&id).await?;
    Ok(accepted(response))
}

pub async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    state.coordinator.delete(&id).await?;
    Ok(no_content())
}
