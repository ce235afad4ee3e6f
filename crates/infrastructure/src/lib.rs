//! Momenarr infrastructure: SQLite-backed repositories and the Trakt client.
//!
//! Concrete adapters for the `MediaRepo`/`NZBRepo`/`TrackingSource` traits
//! defined in `momenarr-core`. The Newznab and NZBGet adapters live in their
//! own crates (`momenarr-indexers`, `momenarr-downloaders`); this crate is
//! everything else that talks to durable state.

pub mod database;
pub mod repositories;
pub mod trakt;

pub use database::{create_pool, migrate, test_connection, DatabasePool};
pub use repositories::{SqliteMediaRepo, SqliteNzbRepo};
pub use trakt::TraktClient;
