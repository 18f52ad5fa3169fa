use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, AppResult};

/// Prefix for environment overrides, e.g. `BATCH_PROBER_WEB__PORT=9000`
pub const ENV_PREFIX: &str = "BATCH_PROBER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_environment")]
    pub environment: String,
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Deadline used when a submission carries no usable timeout
    pub default_timeout_ms: u64,
    /// Extra ceiling on workers per job, applied below the host parallelism
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    pub user_agent: String,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl JobsConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            database: DatabaseConfig {
                url: "sqlite://./batch-prober.db".to_string(),
                max_connections: Some(10),
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            jobs: JobsConfig::default(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5000,
            max_concurrency: None,
            user_agent: format!("batch-prober/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_ms: None,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the optional file, then environment
    pub fn load_from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.web.port == 0 {
            return Err(AppError::configuration("web.port must be greater than 0"));
        }
        if self.jobs.default_timeout_ms == 0 {
            return Err(AppError::configuration(
                "jobs.default_timeout_ms must be greater than 0",
            ));
        }
        if self.jobs.max_concurrency == Some(0) {
            return Err(AppError::configuration(
                "jobs.max_concurrency must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}
