use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod logging;
mod metrics;
mod server;

use crate::config::AppConfig;
use crate::logging::FileLogger;
use crate::metrics::MetricsRegistry;

/// Process-wide state, built once at startup and shared with every handler
pub struct AppState {
    pub config: AppConfig,
    pub metrics: Arc<MetricsRegistry>,
    pub logger: Arc<FileLogger>,
}

impl AppState {
    pub fn new(config: AppConfig) -> error::Result<Self> {
        let logger = Arc::new(FileLogger::open(&config.log_dir)?);
        let metrics = Arc::new(MetricsRegistry::new()?);

        Ok(Self {
            config,
            metrics,
            logger,
        })
    }

    /// Fresh state logging into a temporary directory
    #[cfg(test)]
    pub fn for_tests() -> (Arc<Self>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_dir: dir.path().to_path_buf(),
        };
        (Arc::new(Self::new(config).unwrap()), dir)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_stack=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    tracing::info!("Starting local-stack v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Application log: {}", config.log_file().display());

    server::run(config).await?;

    Ok(())
}
