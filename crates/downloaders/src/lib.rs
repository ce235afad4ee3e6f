//! Download client integration.
//!
//! Provides the single concrete `Downloader` adapter (§6): an NZBGet
//! JSON-RPC client wrapped in a circuit breaker.

pub mod dispatcher;
pub mod nzbget;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatchOutcome};
pub use nzbget::{NzbgetClient, NzbgetConfig};
