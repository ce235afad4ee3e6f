//! Domain models: Media, Nzb, Notification (§3)

use serde::{Deserialize, Serialize};

/// A tracked item: a movie, or an episode of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub trakt_id: i64,
    pub imdb: String,
    pub title: String,
    pub year: i64,
    pub season: i64,
    pub number: i64,
    pub on_disk: bool,
    pub file: String,
    pub download_id: i64,
}

impl Media {
    pub fn new_movie(trakt_id: i64, imdb: impl Into<String>, title: impl Into<String>, year: i64) -> Self {
        Self {
            trakt_id,
            imdb: imdb.into(),
            title: title.into(),
            year,
            season: 0,
            number: 0,
            on_disk: false,
            file: String::new(),
            download_id: 0,
        }
    }

    pub fn new_episode(
        trakt_id: i64,
        imdb: impl Into<String>,
        title: impl Into<String>,
        year: i64,
        season: i64,
        number: i64,
    ) -> Self {
        Self {
            trakt_id,
            imdb: imdb.into(),
            title: title.into(),
            year,
            season,
            number,
            on_disk: false,
            file: String::new(),
            download_id: 0,
        }
    }

    pub fn is_episode(&self) -> bool {
        self.season > 0 && self.number > 0
    }

    pub fn is_movie(&self) -> bool {
        !self.is_episode()
    }
}

/// A scored NZB release candidate for a `Media`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nzb {
    pub release_key: String,
    pub trakt_id: i64,
    pub title: String,
    pub link: String,
    pub length: i64,
    pub failed: bool,

    pub parsed_title: String,
    pub year: i64,
    pub season: i64,
    pub episode: i64,
    pub resolution: String,
    pub source: String,
    pub codec: String,
    pub proper: bool,
    pub repack: bool,

    pub validation_score: i64,
    pub quality_score: i64,
    pub total_score: i64,
}

/// Inbound webhook payload (§3, ephemeral, never persisted). Wire format
/// uses `trakt` for the id field; renamed to `trakt_id` internally to match
/// every other component's naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub name: String,
    pub category: String,
    pub status: String,
    #[serde(rename = "trakt")]
    pub trakt_id: String,
    pub dir: String,
}

impl Notification {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("SUCCESS")
    }
}

/// A single search-result item, common to all three `NZBSearcher` operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub length: i64,
}
