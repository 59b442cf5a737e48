//! Startup error types
//!
//! Everything here is fatal: the service refuses to serve requests it
//! cannot log or measure.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Environment could not be deserialized into `AppConfig`
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid bind host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Log directory could not be created
    #[error("failed to create log directory {}: {source}", dir.display())]
    LogDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be opened for append
    #[error("failed to open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    #[error("failed to build metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
