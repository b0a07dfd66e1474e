use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.health.snapshot();

    if state.health.is_healthy(state.stale_secs) {
        (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "last_block": snap.last_block,
                "consecutive_failures": snap.consecutive_failures,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "started": snap.started,
                "last_block": snap.last_block,
                "last_success_unix": snap.last_success_unix,
                "consecutive_failures": snap.consecutive_failures,
            })),
        )
    }
}
