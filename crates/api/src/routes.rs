//! Router assembly: `POST /api/notify` plus `GET /health` (§7). No other
//! routes are carried over from the teacher's full REST surface.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{health, notify};
use crate::state::ApiState;

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/notify", post(notify::notify))
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
