//! NotificationHandler (C7, §4.7): processes asynchronous downloader
//! completion callbacks. On success, promotes the media to "on disk"; on
//! failure, marks the chosen NZB failed and retries every not-on-disk media
//! with its next-best candidate. Always prunes the downloader's history for
//! the affected download id, bounded by `retry_count`/`retry_delay`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use momenarr_core::{Downloader, MediaRepo, MomenarrError, Notification, NzbRepo, Result};
use momenarr_decision::SelectionEngine;
use momenarr_downloaders::Dispatcher;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const MAX_NAME_LEN: usize = 512;
const MAX_DIR_LEN: usize = 4096;

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Category tag the webhook must present to be accepted (§3, §9: the
    /// only authentication the callback gets).
    pub category: String,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

/// Processes webhook callbacks. Holds a per-`trakt_id` single-flight lock
/// (§9) so concurrent notifications for the same media serialize instead of
/// racing the Success/Failure update paths.
pub struct NotificationHandler {
    media_repo: Arc<dyn MediaRepo>,
    nzb_repo: Arc<dyn NzbRepo>,
    downloader: Arc<dyn Downloader>,
    dispatcher: Arc<Dispatcher>,
    selection: Arc<SelectionEngine>,
    config: NotificationConfig,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

fn validate_structural(n: &Notification) -> Result<()> {
    if n.name.is_empty() || n.name.len() > MAX_NAME_LEN {
        return Err(MomenarrError::Validation {
            field: "name".to_string(),
            message: "must be non-empty and within length cap".to_string(),
        });
    }
    if n.category.is_empty() {
        return Err(MomenarrError::Validation {
            field: "category".to_string(),
            message: "must be non-empty".to_string(),
        });
    }
    if n.status.is_empty() {
        return Err(MomenarrError::Validation {
            field: "status".to_string(),
            message: "must be non-empty".to_string(),
        });
    }
    if n.trakt_id.is_empty() {
        return Err(MomenarrError::Validation {
            field: "trakt_id".to_string(),
            message: "must be non-empty".to_string(),
        });
    }
    if n.dir.len() > MAX_DIR_LEN {
        return Err(MomenarrError::Validation {
            field: "dir".to_string(),
            message: "exceeds length cap".to_string(),
        });
    }
    Ok(())
}

impl NotificationHandler {
    pub fn new(
        media_repo: Arc<dyn MediaRepo>,
        nzb_repo: Arc<dyn NzbRepo>,
        downloader: Arc<dyn Downloader>,
        dispatcher: Arc<Dispatcher>,
        selection: Arc<SelectionEngine>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            media_repo,
            nzb_repo,
            downloader,
            dispatcher,
            selection,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, trakt_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(trakt_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Entry point from the webhook (§4.7). Returns `Ok(())` even when the
    /// notification was ignored (category mismatch) — the HTTP layer
    /// acknowledges 200 regardless (§7).
    pub async fn handle(&self, notification: Notification) -> Result<()> {
        validate_structural(&notification)?;

        if notification.category != self.config.category {
            debug!(category = %notification.category, "ignoring notification: category mismatch");
            return Ok(());
        }

        let trakt_id: i64 = notification.trakt_id.parse().map_err(|_| MomenarrError::Validation {
            field: "trakt_id".to_string(),
            message: format!("not a valid integer: {}", notification.trakt_id),
        })?;

        let per_media_lock = self.lock_for(trakt_id).await;
        let _guard = per_media_lock.lock().await;

        let mut media = self
            .media_repo
            .get(trakt_id)
            .await?
            .ok_or_else(|| MomenarrError::NotFound {
                resource: format!("media:{trakt_id}"),
            })?;

        let download_id = media.download_id;

        if notification.is_success() {
            media.file = notification.dir.clone();
            media.on_disk = true;
            self.media_repo.update(&media).await?;
            info!(trakt_id, file = %media.file, "media promoted to on-disk");
        } else {
            warn!(trakt_id, title = %notification.name, "download failed, marking NZB and retrying");
            self.nzb_repo.mark_failed(&notification.name).await?;
            self.retry_all_pending().await;
        }

        if download_id > 0 {
            self.prune_history(download_id).await;
        }

        Ok(())
    }

    /// For every media not on disk, take its next-best non-failed NZB and
    /// re-dispatch. Per-item failures are logged, never abort the loop
    /// (§4.7 step 5).
    async fn retry_all_pending(&self) {
        let pending = match self.media_repo.find_not_on_disk().await {
            Ok(media) => media,
            Err(e) => {
                warn!(error = %e, "failed to list pending media for retry");
                return;
            }
        };

        for media in pending {
            let nzb = match self.selection.get_nzb(media.trakt_id).await {
                Ok(nzb) => nzb,
                Err(e) => {
                    debug!(trakt_id = media.trakt_id, error = %e, "no replacement NZB available");
                    continue;
                }
            };
            if let Err(e) = self.dispatcher.create_download(media.trakt_id, &nzb).await {
                warn!(trakt_id = media.trakt_id, error = %e, "retry dispatch failed");
            }
        }
    }

    /// Bounded retry loop: up to `retry_count` attempts, `retry_delay`
    /// between tries, stopping as soon as the downloader's history contains
    /// (and is made to delete) `download_id` (§4.7 step 6).
    async fn prune_history(&self, download_id: i64) {
        for attempt in 1..=self.config.retry_count.max(1) {
            match self.downloader.history(true).await {
                Ok(history) => {
                    if history.iter().any(|h| h.nzb_id == download_id) {
                        if let Err(e) = self.downloader.delete_from_history(download_id).await {
                            warn!(download_id, error = %e, "failed to delete from downloader history");
                        } else {
                            debug!(download_id, attempt, "pruned downloader history");
                        }
                        return;
                    }
                }
                Err(e) => {
                    warn!(download_id, attempt, error = %e, "failed to read downloader history");
                }
            }
            if attempt < self.config.retry_count.max(1) {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
        debug!(download_id, "history prune exhausted retries without finding the id");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use momenarr_core::{AppendRequest, Blacklist, HistoryItem, Media, Nzb, QueueGroup, SearchResult};
    use momenarr_decision::Thresholds;
    use momenarr_decision::SelectionConfig;
    use momenarr_downloaders::DispatcherConfig;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeMediaRepo {
        media: StdMutex<Vec<Media>>,
    }

    #[async_trait]
    impl MediaRepo for FakeMediaRepo {
        async fn insert(&self, media: &Media) -> Result<()> {
            self.media.lock().unwrap().push(media.clone());
            Ok(())
        }
        async fn get(&self, trakt_id: i64) -> Result<Option<Media>> {
            Ok(self.media.lock().unwrap().iter().find(|m| m.trakt_id == trakt_id).cloned())
        }
        async fn update(&self, media: &Media) -> Result<()> {
            let mut guard = self.media.lock().unwrap();
            if let Some(existing) = guard.iter_mut().find(|m| m.trakt_id == media.trakt_id) {
                *existing = media.clone();
            }
            Ok(())
        }
        async fn delete(&self, trakt_id: i64) -> Result<()> {
            self.media.lock().unwrap().retain(|m| m.trakt_id != trakt_id);
            Ok(())
        }
        async fn all(&self) -> Result<Vec<Media>> {
            Ok(self.media.lock().unwrap().clone())
        }
        async fn all_trakt_ids(&self) -> Result<Vec<i64>> {
            Ok(self.media.lock().unwrap().iter().map(|m| m.trakt_id).collect())
        }
        async fn find_not_on_disk(&self) -> Result<Vec<Media>> {
            Ok(self.media.lock().unwrap().iter().filter(|m| !m.on_disk).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeNzbRepo {
        nzbs: StdMutex<Vec<Nzb>>,
    }

    #[async_trait]
    impl NzbRepo for FakeNzbRepo {
        async fn insert(&self, nzb: &Nzb) -> Result<()> {
            self.nzbs.lock().unwrap().push(nzb.clone());
            Ok(())
        }
        async fn get(&self, release_key: &str) -> Result<Option<Nzb>> {
            Ok(self.nzbs.lock().unwrap().iter().find(|n| n.release_key == release_key).cloned())
        }
        async fn find_by_trakt_id(&self, trakt_id: i64) -> Result<Vec<Nzb>> {
            Ok(self.nzbs.lock().unwrap().iter().filter(|n| n.trakt_id == trakt_id).cloned().collect())
        }
        async fn mark_failed(&self, title: &str) -> Result<()> {
            let mut guard = self.nzbs.lock().unwrap();
            for n in guard.iter_mut().filter(|n| n.title == title) {
                n.failed = true;
            }
            Ok(())
        }
        async fn delete_by_trakt_id(&self, trakt_id: i64) -> Result<()> {
            self.nzbs.lock().unwrap().retain(|n| n.trakt_id != trakt_id);
            Ok(())
        }
    }

    struct FakeDownloader {
        history: StdMutex<Vec<HistoryItem>>,
        deleted: StdMutex<Vec<i64>>,
        appended: StdMutex<Vec<AppendRequest>>,
    }

    impl FakeDownloader {
        fn new(history: Vec<HistoryItem>) -> Self {
            Self {
                history: StdMutex::new(history),
                deleted: StdMutex::new(vec![]),
                appended: StdMutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn append(&self, req: AppendRequest) -> Result<i64> {
            self.appended.lock().unwrap().push(req);
            Ok(77)
        }
        async fn list_groups(&self) -> Result<Vec<QueueGroup>> {
            Ok(vec![])
        }
        async fn history(&self, _include_hidden: bool) -> Result<Vec<HistoryItem>> {
            Ok(self.history.lock().unwrap().clone())
        }
        async fn delete_from_history(&self, download_id: i64) -> Result<()> {
            self.deleted.lock().unwrap().push(download_id);
            self.history.lock().unwrap().retain(|h| h.nzb_id != download_id);
            Ok(())
        }
    }

    struct FakeSearcher;

    #[async_trait]
    impl momenarr_core::NzbSearcher for FakeSearcher {
        async fn search_movie(&self, _imdb: &str) -> Result<Vec<SearchResult>> {
            Ok(vec![])
        }
        async fn search_episode(&self, _imdb: &str, _season: i64, _number: i64) -> Result<Vec<SearchResult>> {
            Ok(vec![])
        }
        async fn search_season_pack(&self, _imdb: &str, _season: i64) -> Result<Vec<SearchResult>> {
            Ok(vec![])
        }
    }

    fn sample_notification(status: &str, trakt_id: &str) -> Notification {
        Notification {
            name: "The.Shawshank.Redemption.1994.2160p.REMUX.x265-GRP".to_string(),
            category: "momenarr".to_string(),
            status: status.to_string(),
            trakt_id: trakt_id.to_string(),
            dir: "/downloads/shawshank".to_string(),
        }
    }

    fn config() -> NotificationConfig {
        NotificationConfig {
            category: "momenarr".to_string(),
            retry_count: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn selection_engine(media_repo: Arc<dyn MediaRepo>, nzb_repo: Arc<dyn NzbRepo>) -> Arc<SelectionEngine> {
        Arc::new(SelectionEngine::new(
            Arc::new(FakeSearcher),
            media_repo,
            nzb_repo,
            Blacklist::default(),
            SelectionConfig {
                thresholds: Thresholds {
                    title_similarity_min: 0.7,
                    year_tolerance: 1,
                    min_validation_score: 65,
                },
                min_quality_score: 0,
                min_total_score: 0,
                guid_prefix: "https://indexer.example/dl/".to_string(),
            },
        ))
    }

    #[tokio::test]
    async fn category_mismatch_is_ignored() {
        let media_repo: Arc<dyn MediaRepo> = Arc::new(FakeMediaRepo::default());
        let nzb_repo: Arc<dyn NzbRepo> = Arc::new(FakeNzbRepo::default());
        let downloader: Arc<dyn Downloader> = Arc::new(FakeDownloader::new(vec![]));
        let dispatcher = Arc::new(
            Dispatcher::new(
                downloader.clone(),
                media_repo.clone(),
                DispatcherConfig {
                    category: "momenarr".to_string(),
                    dupe_mode: "score".to_string(),
                    http_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );
        let selection = selection_engine(media_repo.clone(), nzb_repo.clone());
        let handler = NotificationHandler::new(media_repo, nzb_repo, downloader, dispatcher, selection, config());

        let mut n = sample_notification("SUCCESS", "1");
        n.category = "other-app".to_string();
        handler.handle(n).await.unwrap();
    }

    #[tokio::test]
    async fn s1_success_promotes_media_to_on_disk_and_prunes_history() {
        let media_repo: Arc<dyn MediaRepo> = Arc::new(FakeMediaRepo::default());
        let nzb_repo: Arc<dyn NzbRepo> = Arc::new(FakeNzbRepo::default());
        let mut media = Media::new_movie(1, "tt0111161", "The Shawshank Redemption", 1994);
        media.download_id = 42;
        media_repo.insert(&media).await.unwrap();

        let downloader: Arc<dyn Downloader> = Arc::new(FakeDownloader::new(vec![HistoryItem { nzb_id: 42 }]));
        let dispatcher = Arc::new(
            Dispatcher::new(
                downloader.clone(),
                media_repo.clone(),
                DispatcherConfig {
                    category: "momenarr".to_string(),
                    dupe_mode: "score".to_string(),
                    http_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );
        let selection = selection_engine(media_repo.clone(), nzb_repo.clone());
        let handler = NotificationHandler::new(
            media_repo.clone(),
            nzb_repo,
            downloader,
            dispatcher,
            selection,
            config(),
        );

        handler.handle(sample_notification("SUCCESS", "1")).await.unwrap();

        let updated = media_repo.get(1).await.unwrap().unwrap();
        assert!(updated.on_disk);
        assert_eq!(updated.file, "/downloads/shawshank");
    }

    #[tokio::test]
    async fn s3_failure_marks_nzb_failed() {
        let media_repo: Arc<dyn MediaRepo> = Arc::new(FakeMediaRepo::default());
        let nzb_repo: Arc<dyn NzbRepo> = Arc::new(FakeNzbRepo::default());
        let mut media = Media::new_movie(1, "tt0111161", "The Shawshank Redemption", 1994);
        media.download_id = 42;
        media_repo.insert(&media).await.unwrap();
        nzb_repo
            .insert(&Nzb {
                release_key: "remux123".to_string(),
                trakt_id: 1,
                title: "The.Shawshank.Redemption.1994.2160p.REMUX.x265-GRP".to_string(),
                link: "https://indexer.example/dl/remux123".to_string(),
                length: 1,
                failed: false,
                parsed_title: "the shawshank redemption".to_string(),
                year: 1994,
                season: 0,
                episode: 0,
                resolution: "2160P".to_string(),
                source: "REMUX".to_string(),
                codec: "X265".to_string(),
                proper: false,
                repack: false,
                validation_score: 100,
                quality_score: 90,
                total_score: 190,
            })
            .await
            .unwrap();

        let downloader: Arc<dyn Downloader> = Arc::new(FakeDownloader::new(vec![]));
        let dispatcher = Arc::new(
            Dispatcher::new(
                downloader.clone(),
                media_repo.clone(),
                DispatcherConfig {
                    category: "momenarr".to_string(),
                    dupe_mode: "score".to_string(),
                    http_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );
        let selection = selection_engine(media_repo.clone(), nzb_repo.clone());
        let handler = NotificationHandler::new(
            media_repo,
            nzb_repo.clone(),
            downloader,
            dispatcher,
            selection,
            config(),
        );

        handler
            .handle(sample_notification(
                "FAILURE",
                "1",
            ))
            .await
            .unwrap();

        let nzbs = nzb_repo.find_by_trakt_id(1).await.unwrap();
        assert!(nzbs[0].failed);
    }

    #[tokio::test]
    async fn missing_media_is_not_found() {
        let media_repo: Arc<dyn MediaRepo> = Arc::new(FakeMediaRepo::default());
        let nzb_repo: Arc<dyn NzbRepo> = Arc::new(FakeNzbRepo::default());
        let downloader: Arc<dyn Downloader> = Arc::new(FakeDownloader::new(vec![]));
        let dispatcher = Arc::new(
            Dispatcher::new(
                downloader.clone(),
                media_repo.clone(),
                DispatcherConfig {
                    category: "momenarr".to_string(),
                    dupe_mode: "score".to_string(),
                    http_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );
        let selection = selection_engine(media_repo.clone(), nzb_repo.clone());
        let handler = NotificationHandler::new(media_repo, nzb_repo, downloader, dispatcher, selection, config());

        let err = handler.handle(sample_notification("SUCCESS", "999")).await.unwrap_err();
        assert!(matches!(err, MomenarrError::NotFound { .. }));
    }

    #[tokio::test]
    async fn structural_validation_rejects_empty_name() {
        let media_repo: Arc<dyn MediaRepo> = Arc::new(FakeMediaRepo::default());
        let nzb_repo: Arc<dyn NzbRepo> = Arc::new(FakeNzbRepo::default());
        let downloader: Arc<dyn Downloader> = Arc::new(FakeDownloader::new(vec![]));
        let dispatcher = Arc::new(
            Dispatcher::new(
                downloader.clone(),
                media_repo.clone(),
                DispatcherConfig {
                    category: "momenarr".to_string(),
                    dupe_mode: "score".to_string(),
                    http_timeout: Duration::from_secs(5),
                },
            )
            .unwrap(),
        );
        let selection = selection_engine(media_repo.clone(), nzb_repo.clone());
        let handler = NotificationHandler::new(media_repo, nzb_repo, downloader, dispatcher, selection, config());

        let mut n = sample_notification("SUCCESS", "1");
        n.name = String::new();
        let err = handler.handle(n).await.unwrap_err();
        assert!(matches!(err, MomenarrError::Validation { .. }));
    }
}
