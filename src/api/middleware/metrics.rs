//! HTTP Metrics Middleware
//!
//! Records Prometheus metrics for every HTTP request once its response has
//! been sent:
//! - Request count by method, path, and status
//! - Request duration histogram
//!
//! The literal request path is used as the `route` label; path segments are
//! not collapsed into route templates.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::finish::on_finish;
use crate::metrics::Timer;
use crate::AppState;

/// Middleware to record HTTP metrics for each request
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let timer = Timer::new();

    // Extract method and path before consuming the request
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let registry = state.metrics.clone();

    on_finish(response, move |_| {
        registry.record_request(&method, &path, status, timer.elapsed_secs());
    })
}
