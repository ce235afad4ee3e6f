//! Application configuration, loaded from environment variables (§6).

use crate::error::{MomenarrError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: String,
    pub download_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
            download_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub trakt_api_key: String,
    pub trakt_client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub newznab_host: String,
    pub newznab_api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    pub nzbget_url: String,
    pub nzbget_user: String,
    pub nzbget_pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub task_interval: Duration,
    pub http_timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub history_lookback_days: i64,
    pub next_episodes_count: i64,
    pub nzb_category: String,
    pub nzb_dupe_mode: String,
    pub shutdown_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            task_interval: Duration::from_secs(6 * 3600),
            http_timeout: Duration::from_secs(30),
            retry_count: 3,
            retry_delay: Duration::from_secs(10),
            history_lookback_days: 5,
            next_episodes_count: 3,
            nzb_category: "momenarr".to_string(),
            nzb_dupe_mode: "score".to_string(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub title_similarity_min: f64,
    pub year_tolerance: i64,
    pub min_validation_score: i64,
    pub min_quality_score: i64,
    pub min_total_score: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            title_similarity_min: 0.7,
            year_tolerance: 1,
            min_validation_score: 65,
            min_quality_score: 0,
            min_total_score: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub tracking: TrackingConfig,
    pub indexer: IndexerConfig,
    pub downloader: DownloaderConfig,
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub validation: ValidationConfig,
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| MomenarrError::Configuration {
        field: name.to_string(),
        message: "required environment variable is not set".to_string(),
    })
}

fn parse_duration_env(name: &str, default: Duration) -> Result<Duration> {
    match env::var(name) {
        Ok(raw) => humantime::parse_duration(&raw).map_err(|e| MomenarrError::Configuration {
            field: name.to_string(),
            message: format!("invalid duration {raw:?}: {e}"),
        }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to defaults
    /// for optional settings (§6).
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig {
            store: StoreConfig::default(),
            tracking: TrackingConfig {
                trakt_api_key: require_env("TRAKT_API_KEY")?,
                trakt_client_secret: require_env("TRAKT_CLIENT_SECRET")?,
            },
            indexer: IndexerConfig {
                newznab_host: require_env("NEWSNAB_HOST")?,
                newznab_api_key: require_env("NEWSNAB_API_KEY")?,
            },
            downloader: DownloaderConfig {
                nzbget_url: require_env("NZBGET_URL")?,
                nzbget_user: env::var("NZBGET_USER").unwrap_or_default(),
                nzbget_pass: env::var("NZBGET_PASS").unwrap_or_default(),
            },
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            validation: ValidationConfig::default(),
        };

        config.store.download_dir = require_env("DOWNLOAD_DIR")?;

        if let Ok(v) = env::var("DATA_DIR") {
            config.store.data_dir = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            config.server.bind_addr = format!("0.0.0.0:{v}");
        }

        config.pipeline.task_interval =
            parse_duration_env("TASK_INTERVAL", config.pipeline.task_interval)?;
        config.pipeline.http_timeout =
            parse_duration_env("HTTP_TIMEOUT", config.pipeline.http_timeout)?;
        config.pipeline.retry_delay =
            parse_duration_env("RETRY_DELAY", config.pipeline.retry_delay)?;

        if let Ok(v) = env::var("RETRY_COUNT") {
            config.pipeline.retry_count = v.parse().map_err(|_| MomenarrError::Configuration {
                field: "RETRY_COUNT".to_string(),
                message: "must be an integer".to_string(),
            })?;
        }
        if let Ok(v) = env::var("HISTORY_LOOKBACK_DAYS") {
            config.pipeline.history_lookback_days =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "HISTORY_LOOKBACK_DAYS".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }
        if let Ok(v) = env::var("NEXT_EPISODES_COUNT") {
            config.pipeline.next_episodes_count =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "NEXT_EPISODES_COUNT".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }
        if let Ok(v) = env::var("NZB_CATEGORY") {
            config.pipeline.nzb_category = v;
        }
        if let Ok(v) = env::var("NZB_DUPE_MODE") {
            config.pipeline.nzb_dupe_mode = v;
        }

        if let Ok(v) = env::var("TITLE_SIMILARITY_MIN") {
            config.validation.title_similarity_min =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "TITLE_SIMILARITY_MIN".to_string(),
                    message: "must be a float".to_string(),
                })?;
        }
        if let Ok(v) = env::var("YEAR_TOLERANCE") {
            config.validation.year_tolerance =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "YEAR_TOLERANCE".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }
        if let Ok(v) = env::var("MIN_VALIDATION_SCORE") {
            config.validation.min_validation_score =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "MIN_VALIDATION_SCORE".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }
        if let Ok(v) = env::var("MIN_QUALITY_SCORE") {
            config.validation.min_quality_score =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "MIN_QUALITY_SCORE".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }
        if let Ok(v) = env::var("MIN_TOTAL_SCORE") {
            config.validation.min_total_score =
                v.parse().map_err(|_| MomenarrError::Configuration {
                    field: "MIN_TOTAL_SCORE".to_string(),
                    message: "must be an integer".to_string(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate non-empty/non-zero invariants the rest of the system relies on.
    pub fn validate(&self) -> Result<()> {
        if self.store.download_dir.is_empty() {
            return Err(MomenarrError::Configuration {
                field: "store.download_dir".to_string(),
                message: "download dir must not be empty".to_string(),
            });
        }
        if self.tracking.trakt_api_key.is_empty() {
            return Err(MomenarrError::Configuration {
                field: "tracking.trakt_api_key".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.indexer.newznab_host.is_empty() {
            return Err(MomenarrError::Configuration {
                field: "indexer.newznab_host".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.downloader.nzbget_url.is_empty() {
            return Err(MomenarrError::Configuration {
                field: "downloader.nzbget_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.validation.title_similarity_min) {
            return Err(MomenarrError::Configuration {
                field: "validation.title_similarity_min".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }

    pub fn data_db_path(&self) -> String {
        format!("{}/data.db", self.store.data_dir)
    }

    pub fn token_path(&self) -> String {
        format!("{}/token.json", self.store.data_dir)
    }

    pub fn blacklist_path(&self) -> String {
        format!("{}/blacklist.txt", self.store.data_dir)
    }
}
