//! Shared axum state: the `NotificationHandler` the webhook dispatches to,
//! plus the liveness snapshot the Orchestrator keeps up to date.

use std::sync::Arc;

use momenarr_core::HealthState;
use momenarr_notifications::NotificationHandler;

#[derive(Clone)]
pub struct ApiState {
    pub notifications: Arc<NotificationHandler>,
    pub health: HealthState,
}

impl ApiState {
    pub fn new(notifications: Arc<NotificationHandler>, health: HealthState) -> Self {
        Self { notifications, health }
    }
}
