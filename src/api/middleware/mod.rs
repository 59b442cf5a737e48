//! API Middleware
//!
//! Contains middleware for:
//! - Access logging to the application log file
//! - HTTP metrics recording
//!
//! Both observe the same response-finished notification.

pub mod access_log;
pub mod finish;
pub mod metrics;

pub use self::access_log::access_log_middleware;
pub use self::metrics::metrics_middleware;
