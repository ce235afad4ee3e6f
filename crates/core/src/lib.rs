//! Domain models, traits, and shared infrastructure for Momenarr.
//!
//! This crate holds everything the reconciliation pipeline needs that isn't
//! tied to a concrete external service: the `Media`/`Nzb` domain model, the
//! five narrow traits the core consumes (`TrackingSource`, `NZBSearcher`,
//! `Downloader`, `MediaRepo`, `NZBRepo`), configuration, error types, retry
//! and circuit-breaker helpers, and the blacklist cache.

pub mod blacklist;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod retry;
pub mod traits;

pub use blacklist::{Blacklist, BlacklistCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics};
pub use config::AppConfig;
pub use error::{ErrorKind, MomenarrError, Result};
pub use health::{HealthSnapshot, HealthState};
pub use models::{Media, Notification, Nzb, SearchResult};
pub use retry::{retry_with_backoff, RetryConfig, RetryPolicy};
pub use traits::{
    AppendRequest, Downloader, HistoryEntry, HistoryItem, HistoryItemType, MediaRepo, NzbRepo,
    NzbSearcher, QueueGroup, TrackedEpisode, TrackedMovie, TrackedShow, TrackingSource,
    WatchedProgress,
};
