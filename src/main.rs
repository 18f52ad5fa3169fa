use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batch_prober::{
    config::Config,
    database::Database,
    repositories::JobRepository,
    services::{CoordinatorSettings, HttpPinger, JobCoordinator, Prober},
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "batch-prober")]
#[command(version)]
#[command(about = "Batch URL reachability checker with a polling HTTP API")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("batch_prober={},tower_http=trace", cli.log_level)
    } else {
        format!("batch_prober={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Batch Prober v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using database: {}", config.database.url);
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let pinger = HttpPinger::from_config(&config.jobs)?;
    let settings = CoordinatorSettings::from_config(&config.jobs);
    info!(
        "Job coordinator ready: default timeout {}ms, at most {} workers per job",
        settings.default_timeout_ms, settings.concurrency_ceiling
    );
    let coordinator = JobCoordinator::new(
        Arc::new(JobRepository::new(database.pool())),
        Prober::new(Arc::new(pinger)),
        settings,
    );

    let web_server = WebServer::new(&config.web, database, coordinator.clone())?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve(shutdown_signal()).await?;

    coordinator.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
