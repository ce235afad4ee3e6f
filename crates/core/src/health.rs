//! Liveness state shared between the Orchestrator and the webhook surface
//! (§7: `GET /health` reports process liveness plus whether the last
//! Orchestrator cycle succeeded).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    database_ok: AtomicBool,
    last_cycle_ok: AtomicBool,
    last_cycle_unix: AtomicI64,
}

/// Cheaply cloneable handle; the Orchestrator writes, the API reads.
#[derive(Debug, Clone)]
pub struct HealthState(Arc<Inner>);

impl Default for HealthState {
    fn default() -> Self {
        Self(Arc::new(Inner {
            database_ok: AtomicBool::new(true),
            last_cycle_ok: AtomicBool::new(true),
            last_cycle_unix: AtomicI64::new(0),
        }))
    }
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_database_ok(&self, ok: bool) {
        self.0.database_ok.store(ok, Ordering::Relaxed);
    }

    pub fn record_cycle(&self, ok: bool, unix_timestamp: i64) {
        self.0.last_cycle_ok.store(ok, Ordering::Relaxed);
        self.0.last_cycle_unix.store(unix_timestamp, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            database_ok: self.0.database_ok.load(Ordering::Relaxed),
            last_cycle_ok: self.0.last_cycle_ok.load(Ordering::Relaxed),
            last_cycle_unix: self.0.last_cycle_unix.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub database_ok: bool,
    pub last_cycle_ok: bool,
    pub last_cycle_unix: i64,
}

impl HealthSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.database_ok && self.last_cycle_ok
    }
}
