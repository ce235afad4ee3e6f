//! POST /api/notify - the downloader's completion callback (§4.7, §7).
//! Acknowledges immediately and processes in a detached task, matching the
//! teacher's ack-then-process webhook pattern.

use axum::{extract::State, http::StatusCode, Json};
use momenarr_core::Notification;
use tracing::{error, info};

use crate::state::ApiState;

pub async fn notify(State(state): State<ApiState>, Json(notification): Json<Notification>) -> StatusCode {
    info!(name = %notification.name, status = %notification.status, "received notification");

    let handler = state.notifications.clone();
    tokio::spawn(async move {
        if let Err(e) = handler.handle(notification).await {
            error!(error = %e, "notification handling failed");
        }
    });

    StatusCode::OK
}
