use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::middleware::{access_log_middleware, metrics_middleware};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::demo::root))
        .route("/health", get(handlers::demo::health))
        .route("/slow", get(handlers::demo::slow))
        .route("/metrics", get(handlers::metrics::scrape))
        .fallback(not_found);

    instrument(routes, state)
}

/// Wrap `routes` in the observation chain: access log (outermost), then
/// metrics, then panic recovery so a panicking handler is still observed as
/// a 500.
pub fn instrument(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .layer(CatchPanicLayer::new())
        .layer(axum_middleware::from_fn_with_state(state.clone(), metrics_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), access_log_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
