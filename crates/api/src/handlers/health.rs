//! GET /health - process liveness plus last Orchestrator cycle result.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::state::ApiState;

pub async fn health_check(State(state): State<ApiState>) -> (StatusCode, Json<serde_json::Value>) {
    let snapshot = state.health.snapshot();
    let status = if snapshot.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if snapshot.is_healthy() { "healthy" } else { "degraded" },
            "database_ok": snapshot.database_ok,
            "last_cycle_ok": snapshot.last_cycle_ok,
            "last_cycle_unix": snapshot.last_cycle_unix,
        })),
    )
}
