//! CleanupService (C9, §4.9): scans recent watch history from the tracking
//! source and removes matching local media, their NZBs, and on-disk files.

use std::sync::Arc;

use chrono::Utc;
use momenarr_core::{HistoryItemType, MediaRepo, NzbRepo, Result, TrackingSource};
use tracing::warn;

const PAGE_SIZE: i64 = 50;

pub struct CleanupService {
    tracking: Arc<dyn TrackingSource>,
    media_repo: Arc<dyn MediaRepo>,
    nzb_repo: Arc<dyn NzbRepo>,
    history_lookback_days: i64,
}

impl CleanupService {
    pub fn new(
        tracking: Arc<dyn TrackingSource>,
        media_repo: Arc<dyn MediaRepo>,
        nzb_repo: Arc<dyn NzbRepo>,
        history_lookback_days: i64,
    ) -> Self {
        Self {
            tracking,
            media_repo,
            nzb_repo,
            history_lookback_days,
        }
    }

    /// Paged scan over `[now - lookback, now]`, cleaning up every watched
    /// movie or episode found (§4.9).
    pub async fn run(&self) -> Result<()> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(self.history_lookback_days.max(0));
        let mut page = 1;

        loop {
            let items = self.tracking.history(start, end, page, PAGE_SIZE).await?;
            if items.is_empty() {
                break;
            }

            for item in &items {
                if matches!(item.item_type, HistoryItemType::Movie | HistoryItemType::Episode) {
                    self.cleanup_one(item.trakt_id, &item.title).await;
                }
            }

            if (items.len() as i64) < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(())
    }

    async fn cleanup_one(&self, trakt_id: i64, title: &str) {
        let media = match self.media_repo.get(trakt_id).await {
            Ok(Some(m)) => m,
            Ok(None) => return,
            Err(e) => {
                warn!(trakt_id, title, error = %e, "failed to look up media for cleanup");
                return;
            }
        };

        if let Err(e) = self.media_repo.delete(trakt_id).await {
            warn!(trakt_id, title, error = %e, "failed to delete media during cleanup");
            return;
        }

        if let Err(e) = self.nzb_repo.delete_by_trakt_id(trakt_id).await {
            warn!(trakt_id, error = %e, "failed to delete NZBs during cleanup");
        }

        if !media.file.is_empty() {
            match tokio::fs::remove_file(&media.file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(trakt_id, file = %media.file, error = %e, "failed to remove file during cleanup"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use momenarr_core::{
        HistoryEntry, Media, Nzb, TrackedEpisode, TrackedMovie, TrackedShow, WatchedProgress,
    };
    use std::sync::Mutex;

    struct FakeTracking {
        pages: Mutex<Vec<Vec<HistoryEntry>>>,
    }

    #[async_trait]
    impl TrackingSource for FakeTracking {
        async fn watchlist_movies(&self) -> Result<Vec<TrackedMovie>> {
            Ok(vec![])
        }
        async fn watchlist_shows(&self) -> Result<Vec<TrackedShow>> {
            Ok(vec![])
        }
        async fn favorite_movies(&self) -> Result<Vec<TrackedMovie>> {
            Ok(vec![])
        }
        async fn favorite_shows(&self) -> Result<Vec<TrackedShow>> {
            Ok(vec![])
        }
        async fn watched_progress(&self, _show_trakt_id: i64) -> Result<WatchedProgress> {
            Ok(WatchedProgress { next_season: 0, next_number: 0 })
        }
        async fn episode(&self, _show_trakt_id: i64, _season: i64, _number: i64) -> Result<Option<TrackedEpisode>> {
            Ok(None)
        }
        async fn history(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            page: i64,
            _page_size: i64,
        ) -> Result<Vec<HistoryEntry>> {
            let mut pages = self.pages.lock().unwrap();
            let idx = (page - 1) as usize;
            Ok(pages.get_mut(idx).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeMediaRepo {
        media: Mutex<Vec<Media>>,
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
        nzbs: Mutex<Vec<Nzb>>,
        deleted: Mutex<Vec<i64>>,
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
        async fn mark_failed(&self, _title: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_by_trakt_id(&self, trakt_id: i64) -> Result<()> {
            self.deleted.lock().unwrap().push(trakt_id);
            self.nzbs.lock().unwrap().retain(|n| n.trakt_id != trakt_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn s6_watched_movie_is_removed_with_its_nzbs() {
        let media_repo = Arc::new(FakeMediaRepo::default());
        media_repo
            .insert(&Media::new_movie(1, "tt0111161", "The Shawshank Redemption", 1994))
            .await
            .unwrap();
        let nzb_repo = Arc::new(FakeNzbRepo::default());
        nzb_repo
            .insert(&Nzb {
                release_key: "a".to_string(),
                trakt_id: 1,
                title: "x".to_string(),
                link: "y".to_string(),
                length: 1,
                failed: false,
                parsed_title: "x".to_string(),
                year: 1994,
                season: 0,
                episode: 0,
                resolution: "1080P".to_string(),
                source: "WEB-DL".to_string(),
                codec: "X264".to_string(),
                proper: false,
                repack: false,
                validation_score: 1,
                quality_score: 1,
                total_score: 2,
            })
            .await
            .unwrap();

        let tracking = Arc::new(FakeTracking {
            pages: Mutex::new(vec![vec![HistoryEntry {
                item_type: HistoryItemType::Movie,
                trakt_id: 1,
                title: "The Shawshank Redemption".to_string(),
                watched_at: Utc::now(),
            }]]),
        });

        let service = CleanupService::new(tracking, media_repo.clone(), nzb_repo.clone(), 5);
        service.run().await.unwrap();

        assert!(media_repo.get(1).await.unwrap().is_none());
        assert!(nzb_repo.find_by_trakt_id(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn untracked_history_item_is_a_no_op() {
        let media_repo = Arc::new(FakeMediaRepo::default());
        let nzb_repo = Arc::new(FakeNzbRepo::default());
        let tracking = Arc::new(FakeTracking {
            pages: Mutex::new(vec![vec![HistoryEntry {
                item_type: HistoryItemType::Movie,
                trakt_id: 999,
                title: "Untracked".to_string(),
                watched_at: Utc::now(),
            }]]),
        });

        let service = CleanupService::new(tracking, media_repo, nzb_repo, 5);
        service.run().await.unwrap();
    }
}
