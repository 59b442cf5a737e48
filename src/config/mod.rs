//! Service configuration
//!
//! Read from environment variables (`PORT`, `LOG_DIR`, `HOST`) layered over
//! built-in defaults. `.env` is loaded by `main` before this runs.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{AppError, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_DIR: &str = "/logs";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(env.try_parsing(true).ignore_empty(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Socket address the listener binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|source| AppError::InvalidHost {
            host: self.host.clone(),
            source,
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Path of the application log file
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(crate::logging::LOG_FILE_NAME)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_dir: default_log_dir(),
        }
    }
}
