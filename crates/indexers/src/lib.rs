//! Newznab search-indexer client.
//!
//! Provides the single concrete `NZBSearcher` adapter (§6): a Newznab/Torznab
//! compatible HTTP client wrapped in a circuit breaker.

pub mod newznab;

pub use newznab::{NewznabClient, NewznabConfig};
