//! Demonstration endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;

/// Artificial delay of the `/slow` endpoint
pub const SLOW_RESPONSE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    state.logger.log_line("Root endpoint called");
    Json(StatusResponse {
        status: "ok",
        message: "Hello from local-stack",
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> &'static str {
    state.logger.log_line("Health endpoint called");
    "healthy"
}

/// Answers after `SLOW_RESPONSE_DELAY` without holding a worker thread
pub async fn slow(State(state): State<Arc<AppState>>) -> &'static str {
    tokio::time::sleep(SLOW_RESPONSE_DELAY).await;
    state.logger.log_line("Slow endpoint responded");
    "slow response"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_field_order() {
        let body = serde_json::to_string(&StatusResponse {
            status: "ok",
            message: "Hello from local-stack",
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"ok","message":"Hello from local-stack"}"#);
    }
}
