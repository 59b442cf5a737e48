//! Metrics Module
//!
//! Prometheus-compatible metrics for the service:
//! - HTTP request count by method, route and status code
//! - HTTP request duration histogram with the same labels
//! - Default process metrics, refreshed on every scrape
//!
//! The registry owns its own recorder instead of installing a global one, so
//! every `AppState` (and every test) gets an isolated set of series.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use parking_lot::Mutex;
use std::time::Instant;

use crate::error::Result;

mod process;

use process::ProcessCollector;

/// Metric names as constants for consistency
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "request_duration_seconds";

    pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";
    pub const PROCESS_CPU_USER_SECONDS_TOTAL: &str = "process_cpu_user_seconds_total";
    pub const PROCESS_CPU_SYSTEM_SECONDS_TOTAL: &str = "process_cpu_system_seconds_total";
    pub const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
    pub const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
    pub const PROCESS_VIRTUAL_MEMORY_BYTES: &str = "process_virtual_memory_bytes";
    pub const PROCESS_OPEN_FDS: &str = "process_open_fds";
    pub const PROCESS_MAX_FDS: &str = "process_max_fds";
    pub const PROCESS_THREADS: &str = "process_threads";
}

/// Label keys
pub mod labels {
    pub const METHOD: &str = "method";
    pub const ROUTE: &str = "route";
    pub const CODE: &str = "code";
}

/// Content type of the text exposition format
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Request duration buckets (in seconds)
pub const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    process: ProcessCollector,
    // Held while recording a counter/histogram pair and while rendering, so a
    // scrape never observes one half of a request.
    exposition: Mutex<()>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(names::REQUEST_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(names::HTTP_REQUESTS_TOTAL, "Total HTTP requests");
            describe_histogram!(names::REQUEST_DURATION_SECONDS, "Request duration in seconds");
            describe_gauge!(
                names::PROCESS_START_TIME_SECONDS,
                "Start time of the process since unix epoch in seconds"
            );
            describe_counter!(
                names::PROCESS_CPU_USER_SECONDS_TOTAL,
                "Total user CPU time spent in seconds"
            );
            describe_counter!(
                names::PROCESS_CPU_SYSTEM_SECONDS_TOTAL,
                "Total system CPU time spent in seconds"
            );
            describe_counter!(
                names::PROCESS_CPU_SECONDS_TOTAL,
                "Total user and system CPU time spent in seconds"
            );
            describe_gauge!(names::PROCESS_RESIDENT_MEMORY_BYTES, "Resident memory size in bytes");
            describe_gauge!(names::PROCESS_VIRTUAL_MEMORY_BYTES, "Virtual memory size in bytes");
            describe_gauge!(names::PROCESS_OPEN_FDS, "Number of open file descriptors");
            describe_gauge!(names::PROCESS_MAX_FDS, "Maximum number of open file descriptors");
            describe_gauge!(names::PROCESS_THREADS, "Number of OS threads in the process");
        });

        Ok(Self {
            recorder,
            handle,
            process: ProcessCollector::new(),
            exposition: Mutex::new(()),
        })
    }

    /// Record one completed HTTP request
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();

        let _guard = self.exposition.lock();
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                names::HTTP_REQUESTS_TOTAL,
                labels::METHOD => method.to_string(),
                labels::ROUTE => route.to_string(),
                labels::CODE => status_str.clone()
            )
            .increment(1);

            histogram!(
                names::REQUEST_DURATION_SECONDS,
                labels::METHOD => method.to_string(),
                labels::ROUTE => route.to_string(),
                labels::CODE => status_str
            )
            .record(duration_secs);
        });
    }

    /// Render every registered series in the text exposition format
    pub fn render(&self) -> String {
        let snapshot = self.process.collect();

        let _guard = self.exposition.lock();
        metrics::with_local_recorder(&self.recorder, || snapshot.publish());
        self.handle.render()
    }

    pub fn content_type(&self) -> &'static str {
        EXPOSITION_CONTENT_TYPE
    }
}

// ============================================================================
// Timer Helper
// ============================================================================

/// Timer for measuring durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
