//! Newznab-compatible search-indexer client (`NZBSearcher`, §6).
//!
//! Talks to a single configured Newznab host. Responses are an RSS-like XML
//! document; items carry `title`, `enclosure.url`, `enclosure.length`.

use async_trait::async_trait;
use momenarr_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use momenarr_core::retry::{retry_with_backoff, RetryConfig};
use momenarr_core::{MomenarrError, NzbSearcher, Result, SearchResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct NewznabConfig {
    pub host: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Newznab/Torznab client, one circuit breaker per configured host.
pub struct NewznabClient {
    config: NewznabConfig,
    client: Client,
    circuit_breaker: CircuitBreaker,
}

impl NewznabClient {
    pub fn new(config: NewznabConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MomenarrError::ExternalService {
                service: "newznab".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let circuit_breaker_config = CircuitBreakerConfig::new("newznab")
            .with_failure_threshold(5)
            .with_timeout(Duration::from_secs(30))
            .with_request_timeout(config.timeout)
            .with_success_threshold(2);

        Ok(Self {
            config,
            client,
            circuit_breaker: CircuitBreaker::new(circuit_breaker_config),
        })
    }

    async fn search(&self, params: &[(&str, String)]) -> Result<Vec<SearchResult>> {
        let mut url = reqwest::Url::parse(&self.config.host).map_err(|e| MomenarrError::Configuration {
            field: "indexer.newznab_host".to_string(),
            message: format!("invalid URL: {e}"),
        })?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("apikey", &self.config.api_key);
            for (k, v) in params {
                qp.append_pair(k, v);
            }
        }

        let retry_config = RetryConfig::single_retry();
        let body = retry_with_backoff("newznab-search", &retry_config, || {
            let client = self.client.clone();
            let fetch_url = url.clone();
            let circuit_breaker = &self.circuit_breaker;
            async move {
                circuit_breaker
                    .call(async move {
                        let response = client.get(fetch_url).send().await.map_err(|e| {
                            MomenarrError::Transient {
                                service: "newznab".to_string(),
                                message: e.to_string(),
                            }
                        })?;
                        if !response.status().is_success() {
                            let status = response.status();
                            return Err(MomenarrError::ExternalService {
                                service: "newznab".to_string(),
                                message: format!("HTTP {status}"),
                            });
                        }
                        response.text().await.map_err(|e| MomenarrError::Transient {
                            service: "newznab".to_string(),
                            message: e.to_string(),
                        })
                    })
                    .await
            }
        })
        .await?;

        parse_rss(&body)
    }
}

#[async_trait]
impl NzbSearcher for NewznabClient {
    async fn search_movie(&self, imdb: &str) -> Result<Vec<SearchResult>> {
        debug!(imdb, "searching newznab for movie");
        self.search(&[
            ("t", "movie".to_string()),
            ("imdbid", imdb.trim_start_matches("tt").to_string()),
        ])
        .await
    }

    async fn search_episode(&self, imdb: &str, season: i64, number: i64) -> Result<Vec<SearchResult>> {
        debug!(imdb, season, number, "searching newznab for episode");
        self.search(&[
            ("t", "tvsearch".to_string()),
            ("imdbid", imdb.trim_start_matches("tt").to_string()),
            ("season", season.to_string()),
            ("ep", number.to_string()),
        ])
        .await
    }

    async fn search_season_pack(&self, imdb: &str, season: i64) -> Result<Vec<SearchResult>> {
        debug!(imdb, season, "searching newznab for season pack");
        self.search(&[
            ("t", "tvsearch".to_string()),
            ("imdbid", imdb.trim_start_matches("tt").to_string()),
            ("season", season.to_string()),
        ])
        .await
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize, Default)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: String,
    enclosure: Enclosure,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: String,
    #[serde(rename = "@length", default)]
    length: i64,
}

fn parse_rss(body: &str) -> Result<Vec<SearchResult>> {
    let rss: Rss = quick_xml::de::from_str(body).map_err(|e| {
        warn!(error = %e, "failed to parse newznab RSS response");
        MomenarrError::ParseError {
            message: format!("invalid newznab RSS: {e}"),
        }
    })?;

    Ok(rss
        .channel
        .items
        .into_iter()
        .map(|item| SearchResult {
            title: item.title,
            link: item.enclosure.url,
            length: item.enclosure.length,
        })
        .collect())
}
