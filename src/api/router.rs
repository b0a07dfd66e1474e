use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Operational endpoints only; there is no authenticated surface.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
