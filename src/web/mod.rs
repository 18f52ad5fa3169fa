//! Web layer module
//!
//! HTTP interface for submitting batch checks and polling their results.
//! Handlers stay thin and delegate to the job coordinator.
//!
//! # Routes
//!
//! - `GET    /api/health`
//! - `POST   /api/jobs/check`
//! - `GET    /api/jobs/:id`
//! - `DELETE /api/jobs/:id`
//! - `POST   /api/jobs/:id/cancel`

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{config::WebConfig, database::Database, services::JobCoordinator};

pub mod handlers;
pub mod responses;

pub use responses::{handle_error, ApiError, ApiResponse};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, database: Database, coordinator: JobCoordinator) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let app = Self::create_router(AppState {
            coordinator,
            database,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/api/health", get(handlers::health::health_check))
            .nest("/api/jobs", Self::job_routes())
            // Middleware (applied in reverse order)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    fn job_routes() -> Router<AppState> {
        Router::new()
            .route("/check", post(handlers::jobs::check_urls))
            .route(
                "/:id",
                get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
            )
            .route("/:id/cancel", post(handlers::jobs::cancel_job))
    }

    /// Start the web server, stopping once `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: JobCoordinator,
    pub database: Database,
}
