//! Dispatcher (C5, §4.5): given a media+NZB, skip if already queued/in-history
//! at the downloader, fetch the NZB body, hand it to the downloader, and
//! record the returned download id on the media record.

use std::sync::Arc;
use std::time::Duration;

use momenarr_core::{AppendRequest, Downloader, MediaRepo, MomenarrError, Nzb, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

/// Distinguishes "did submit" from "was already submitted" (§9: treated as a
/// typed success so callers can tell the two apart).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Submitted { download_id: i64 },
    AlreadyQueued,
    AlreadyCompleted,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub category: String,
    pub dupe_mode: String,
    pub http_timeout: Duration,
}

pub struct Dispatcher {
    downloader: Arc<dyn Downloader>,
    media_repo: Arc<dyn MediaRepo>,
    http: Client,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        media_repo: Arc<dyn MediaRepo>,
        config: DispatcherConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| MomenarrError::ExternalService {
                service: "nzb-fetch".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            downloader,
            media_repo,
            http,
            config,
        })
    }

    /// §4.5: lookup media, duplicate-check against the downloader's live
    /// queue and history, fetch the NZB body, submit, and store the
    /// returned download id.
    pub async fn create_download(&self, trakt_id: i64, nzb: &Nzb) -> Result<DispatchOutcome> {
        if trakt_id <= 0 {
            return Err(MomenarrError::Validation {
                field: "trakt_id".to_string(),
                message: "must be positive".to_string(),
            });
        }
        let mut media = self
            .media_repo
            .get(trakt_id)
            .await?
            .ok_or_else(|| MomenarrError::NotFound {
                resource: format!("media:{trakt_id}"),
            })?;

        let groups = self.downloader.list_groups().await?;
        if groups.iter().any(|g| g.nzb_name == nzb.title) {
            debug!(trakt_id, title = %nzb.title, "already queued at downloader");
            return Ok(DispatchOutcome::AlreadyQueued);
        }

        if media.download_id > 0 {
            let history = self.downloader.history(false).await?;
            if history.iter().any(|h| h.nzb_id == media.download_id) {
                debug!(trakt_id, download_id = media.download_id, "already completed at downloader");
                return Ok(DispatchOutcome::AlreadyCompleted);
            }
        }

        let body = self.fetch_body(&nzb.link).await?;

        let req = AppendRequest {
            filename: format!("{}.nzb", nzb.title),
            content: body,
            category: self.config.category.clone(),
            dupe_mode: self.config.dupe_mode.clone(),
            trakt_id,
        };
        let download_id = self.downloader.append(req).await?;
        if download_id <= 0 {
            return Err(MomenarrError::ExternalService {
                service: "downloader".to_string(),
                message: format!("append returned non-positive id for trakt_id={trakt_id}"),
            });
        }

        media.download_id = download_id;
        self.media_repo.update(&media).await?;
        info!(trakt_id, download_id, title = %nzb.title, "submitted download");

        Ok(DispatchOutcome::Submitted { download_id })
    }

    async fn fetch_body(&self, link: &str) -> Result<Vec<u8>> {
        let response = self.http.get(link).send().await.map_err(|e| MomenarrError::Transient {
            service: "nzb-fetch".to_string(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, link, "nzb body fetch failed");
            return Err(MomenarrError::ExternalService {
                service: "nzb-fetch".to_string(),
                message: format!("HTTP {status} fetching {link}"),
            });
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| MomenarrError::Transient {
                service: "nzb-fetch".to_string(),
                message: e.to_string(),
            })
    }
}
