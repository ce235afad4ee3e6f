//! Momenarr's HTTP surface.
//!
//! A minimal `axum` router exposing exactly `POST /api/notify` and
//! `GET /health` — no metrics, monitoring, queue, or search routes are
//! carried over from the teacher's full REST API (§7).

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::ApiState;
