//! The five narrow interfaces the core consumes (§1, §6): `TrackingSource`,
//! `NZBSearcher`, `Downloader`, `MediaRepo`, `NZBRepo`. Concrete adapters live
//! in `momenarr-infrastructure`, `momenarr-indexers`, `momenarr-downloaders`;
//! the core only ever sees these traits so it can be driven by fakes in tests.

use crate::error::Result;
use crate::models::{Media, Nzb, SearchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A movie or show entry as returned by a watchlist/favorites listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMovie {
    pub trakt_id: i64,
    pub imdb: String,
    pub title: String,
    pub year: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedShow {
    pub trakt_id: i64,
    pub imdb: String,
    pub title: String,
    pub year: i64,
}

/// Next-unwatched-episode state for a show, as derived from watched progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedProgress {
    pub next_season: i64,
    pub next_number: i64,
}

/// A single episode lookup result, for resolving the title at (season, number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEpisode {
    pub season: i64,
    pub number: i64,
    pub title: String,
}

/// The kind of item a history entry refers to (§4.9: movie or episode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryItemType {
    Movie,
    Episode,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub item_type: HistoryItemType,
    pub trakt_id: i64,
    pub title: String,
    pub watched_at: DateTime<Utc>,
}

/// Remote "to-watch" reconciliation source (§6). OAuth token handling is an
/// implementation detail behind `load_or_bootstrap` (§9) and is not part of
/// this trait's surface.
#[async_trait]
pub trait TrackingSource: Send + Sync {
    async fn watchlist_movies(&self) -> Result<Vec<TrackedMovie>>;
    async fn watchlist_shows(&self) -> Result<Vec<TrackedShow>>;
    async fn favorite_movies(&self) -> Result<Vec<TrackedMovie>>;
    async fn favorite_shows(&self) -> Result<Vec<TrackedShow>>;

    /// Next-unwatched-episode state for a show (§4.8).
    async fn watched_progress(&self, show_trakt_id: i64) -> Result<WatchedProgress>;

    /// Look up a specific episode's title (§6), used to roll favorites lookahead
    /// forward across season boundaries.
    async fn episode(
        &self,
        show_trakt_id: i64,
        season: i64,
        number: i64,
    ) -> Result<Option<TrackedEpisode>>;

    /// Paged watch history in `[start, end]`, most recent first (§4.9).
    async fn history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<HistoryEntry>>;
}

/// Usenet search-indexer surface (§6). `fetch_body` is not part of this trait:
/// the Dispatcher fetches the NZB body itself with a request-scoped timeout.
#[async_trait]
pub trait NzbSearcher: Send + Sync {
    async fn search_movie(&self, imdb: &str) -> Result<Vec<SearchResult>>;
    async fn search_episode(&self, imdb: &str, season: i64, number: i64) -> Result<Vec<SearchResult>>;
    async fn search_season_pack(&self, imdb: &str, season: i64) -> Result<Vec<SearchResult>>;
}

/// A currently-queued group at the downloader (§4.5 step 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueGroup {
    pub nzb_id: i64,
    pub nzb_name: String,
}

/// A completed (or failed) item in the downloader's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub nzb_id: i64,
}

/// Parameters for submitting a download (§4.5 step 4).
#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub filename: String,
    pub content: Vec<u8>,
    pub category: String,
    pub dupe_mode: String,
    pub trakt_id: i64,
}

/// Download-client RPC surface (§6).
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn append(&self, req: AppendRequest) -> Result<i64>;
    async fn list_groups(&self) -> Result<Vec<QueueGroup>>;
    async fn history(&self, include_hidden: bool) -> Result<Vec<HistoryItem>>;
    async fn delete_from_history(&self, download_id: i64) -> Result<()>;
}

/// Repository over `Media` (§3). Insert of an existing `trakt_id` surfaces as
/// `MomenarrError::DuplicateKey`, never a silent overwrite.
#[async_trait]
pub trait MediaRepo: Send + Sync {
    async fn insert(&self, media: &Media) -> Result<()>;
    async fn get(&self, trakt_id: i64) -> Result<Option<Media>>;
    async fn update(&self, media: &Media) -> Result<()>;
    async fn delete(&self, trakt_id: i64) -> Result<()>;
    async fn all(&self) -> Result<Vec<Media>>;
    async fn all_trakt_ids(&self) -> Result<Vec<i64>>;
    async fn find_not_on_disk(&self) -> Result<Vec<Media>>;
}

/// Repository over `Nzb` (§3). Insert of an existing `release_key` surfaces
/// as `MomenarrError::DuplicateKey` and is treated as success by callers
/// (§4.4: idempotent insert).
#[async_trait]
pub trait NzbRepo: Send + Sync {
    async fn insert(&self, nzb: &Nzb) -> Result<()>;
    async fn get(&self, release_key: &str) -> Result<Option<Nzb>>;
    async fn find_by_trakt_id(&self, trakt_id: i64) -> Result<Vec<Nzb>>;
    async fn mark_failed(&self, title: &str) -> Result<()>;
    async fn delete_by_trakt_id(&self, trakt_id: i64) -> Result<()>;
}
