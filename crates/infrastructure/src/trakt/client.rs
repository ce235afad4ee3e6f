//! `TrackingSource` implementation against the Trakt API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use momenarr_core::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig},
    HistoryEntry, HistoryItemType, MomenarrError, Result, TrackedEpisode, TrackedMovie,
    TrackedShow, TrackingSource, WatchedProgress,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT},
    Client,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::oauth::{OAuthToken, TokenStore, TraktOAuth, TraktOAuthConfig};

/// Trakt API client. Holds the current access token behind a shared lock;
/// refresh acquires the writer side (§5: "reads acquire a shared lock, the
/// refresh a writer lock").
pub struct TraktClient {
    client: Client,
    oauth: TraktOAuth,
    token_store: TokenStore,
    token: RwLock<Option<OAuthToken>>,
    client_id: String,
    base_url: String,
    circuit_breaker: CircuitBreaker,
}

impl TraktClient {
    pub fn new(client_id: String, client_secret: String, token_path: impl Into<String>) -> Self {
        let oauth = TraktOAuth::new(TraktOAuthConfig {
            client_id: client_id.clone(),
            client_secret,
        });

        let circuit_breaker_config = CircuitBreakerConfig::new("trakt")
            .with_failure_threshold(5)
            .with_timeout(Duration::from_secs(30))
            .with_request_timeout(Duration::from_secs(15))
            .with_success_threshold(2);

        Self {
            client: Client::new(),
            oauth,
            token_store: TokenStore::new(token_path),
            token: RwLock::new(None),
            client_id,
            base_url: "https://api.trakt.tv".to_string(),
            circuit_breaker: CircuitBreaker::new(circuit_breaker_config),
        }
    }

    /// Load a persisted token into memory, or bootstrap via device flow.
    /// Implements the design note's "single `TrackingSource` capability with
    /// a `LoadOrBootstrap` method" — the interactive device-code path lives
    /// in the `trakt-auth` binary; this only loads what's on disk.
    pub async fn load_or_bootstrap(&self) -> Result<()> {
        let loaded = self.token_store.load().await?;
        match loaded {
            Some(token) => {
                *self.token.write().await = Some(token);
                Ok(())
            }
            None => Err(MomenarrError::AuthenticationRequired {
                service: "trakt".to_string(),
            }),
        }
    }

    /// Force a token freshness check, refreshing if within five minutes of
    /// expiry. Called from a background timer (§5) so refresh happens
    /// independent of request traffic.
    pub async fn ensure_fresh_token(&self) -> Result<()> {
        self.get_valid_token().await?;
        Ok(())
    }

    async fn get_valid_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref() {
                if !token.needs_refresh() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let refresh_token = {
            let token = self.token.read().await;
            token
                .as_ref()
                .map(|t| t.refresh_token.clone())
                .ok_or_else(|| MomenarrError::AuthenticationRequired {
                    service: "trakt".to_string(),
                })?
        };

        info!("Trakt token expired or expiring, refreshing");
        let new_token = self.oauth.refresh_token(&refresh_token).await?;
        self.token_store.save(&new_token).await?;

        let access_token = new_token.access_token.clone();
        *self.token.write().await = Some(new_token);
        Ok(access_token)
    }

    fn build_headers(&self, access_token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("trakt-api-version", HeaderValue::from_static("2"));
        headers.insert(
            "trakt-api-key",
            HeaderValue::from_str(&self.client_id).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("momenarr/1.0"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let access_token = self.get_valid_token().await?;
        let headers = self.build_headers(&access_token);

        let client = self.client.clone();
        self.circuit_breaker
            .call(async move {
                let response = client.get(&url).headers(headers).send().await.map_err(|e| {
                    MomenarrError::Transient {
                        service: "trakt".to_string(),
                        message: e.to_string(),
                    }
                })?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!(%status, body = %text, "trakt API error");
                    return Err(MomenarrError::ExternalService {
                        service: "trakt".to_string(),
                        message: format!("HTTP {status}: {text}"),
                    });
                }

                response.json::<T>().await.map_err(|e| MomenarrError::ExternalService {
                    service: "trakt".to_string(),
                    message: e.to_string(),
                })
            })
            .await
    }

    /// Like `get`, but treats 404 as `Ok(None)` instead of an error.
    async fn get_optional<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>> {
        match self.get::<T>(path).await {
            Ok(value) => Ok(Some(value)),
            Err(MomenarrError::ExternalService { message, .. }) if message.contains("HTTP 404") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl TrackingSource for TraktClient {
    async fn watchlist_movies(&self) -> Result<Vec<TrackedMovie>> {
        let items: Vec<WatchlistMovieItem> = self.get("/sync/watchlist/movies").await?;
        Ok(items.into_iter().map(|i| i.movie.into()).collect())
    }

    async fn watchlist_shows(&self) -> Result<Vec<TrackedShow>> {
        let items: Vec<WatchlistShowItem> = self.get("/sync/watchlist/shows").await?;
        Ok(items.into_iter().map(|i| i.show.into()).collect())
    }

    async fn favorite_movies(&self) -> Result<Vec<TrackedMovie>> {
        let items: Vec<WatchlistMovieItem> = self.get("/sync/favorites/movies").await?;
        Ok(items.into_iter().map(|i| i.movie.into()).collect())
    }

    async fn favorite_shows(&self) -> Result<Vec<TrackedShow>> {
        let items: Vec<WatchlistShowItem> = self.get("/sync/favorites/shows").await?;
        Ok(items.into_iter().map(|i| i.show.into()).collect())
    }

    async fn watched_progress(&self, show_trakt_id: i64) -> Result<WatchedProgress> {
        let progress: WatchedProgressResponse = self
            .get(&format!("/shows/{show_trakt_id}/progress/watched"))
            .await?;

        Ok(match progress.next_episode {
            Some(next) => WatchedProgress {
                next_season: next.season,
                next_number: next.number,
            },
            None => WatchedProgress {
                next_season: 0,
                next_number: 0,
            },
        })
    }

    async fn episode(&self, show_trakt_id: i64, season: i64, number: i64) -> Result<Option<TrackedEpisode>> {
        let episode: Option<EpisodeResponse> = self
            .get_optional(&format!(
                "/shows/{show_trakt_id}/seasons/{season}/episodes/{number}"
            ))
            .await?;

        Ok(episode.map(|e| TrackedEpisode {
            season,
            number,
            title: e.title,
        }))
    }

    async fn history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<HistoryEntry>> {
        let path = format!(
            "/sync/history?start_at={}&end_at={}&page={page}&limit={page_size}",
            start.to_rfc3339(),
            end.to_rfc3339()
        );
        let items: Vec<HistoryResponseItem> = self.get(&path).await?;

        debug!(count = items.len(), page, "fetched trakt history page");

        Ok(items
            .into_iter()
            .filter_map(|item| match item.item_type.as_str() {
                "movie" => item.movie.map(|m| HistoryEntry {
                    item_type: HistoryItemType::Movie,
                    trakt_id: m.ids.trakt,
                    title: m.title,
                    watched_at: item.watched_at,
                }),
                "episode" => item.show.map(|s| HistoryEntry {
                    item_type: HistoryItemType::Episode,
                    trakt_id: s.ids.trakt,
                    title: s.title,
                    watched_at: item.watched_at,
                }),
                _ => Some(HistoryEntry {
                    item_type: HistoryItemType::Other,
                    trakt_id: 0,
                    title: String::new(),
                    watched_at: item.watched_at,
                }),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct TraktIds {
    trakt: i64,
    imdb: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraktMovie {
    title: String,
    year: Option<i64>,
    ids: TraktIds,
}

impl From<TraktMovie> for TrackedMovie {
    fn from(m: TraktMovie) -> Self {
        TrackedMovie {
            trakt_id: m.ids.trakt,
            imdb: m.ids.imdb.unwrap_or_default(),
            title: m.title,
            year: m.year.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TraktShow {
    title: String,
    year: Option<i64>,
    ids: TraktIds,
}

impl From<TraktShow> for TrackedShow {
    fn from(s: TraktShow) -> Self {
        TrackedShow {
            trakt_id: s.ids.trakt,
            imdb: s.ids.imdb.unwrap_or_default(),
            title: s.title,
            year: s.year.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WatchlistMovieItem {
    movie: TraktMovie,
}

#[derive(Debug, Deserialize)]
struct WatchlistShowItem {
    show: TraktShow,
}

#[derive(Debug, Deserialize)]
struct WatchedProgressResponse {
    next_episode: Option<NextEpisode>,
}

#[derive(Debug, Deserialize)]
struct NextEpisode {
    season: i64,
    number: i64,
}

#[derive(Debug, Deserialize)]
struct EpisodeResponse {
    title: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponseItem {
    #[serde(rename = "type")]
    item_type: String,
    watched_at: DateTime<Utc>,
    movie: Option<TraktMovie>,
    show: Option<TraktShow>,
}
