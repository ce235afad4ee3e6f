//! End-to-end workflow tests for the reconciliation pipeline (§8 S1-S3).
//!
//! Exercises SelectionEngine -> Dispatcher -> NotificationHandler across
//! crate boundaries with fake `TrackingSource`/`NzbSearcher`/`Downloader`
//! adapters, the same way a real `TraktClient`/`NewznabClient`/`NzbgetClient`
//! stack would be wired in `main.rs`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use momenarr_core::{
    AppendRequest, Blacklist, Downloader, HistoryItem, Media, MediaRepo, Nzb, NzbRepo,
    NzbSearcher, QueueGroup, Result, SearchResult,
};
use momenarr_decision::{SelectionConfig, SelectionEngine, Thresholds};
use momenarr_downloaders::{Dispatcher, DispatcherConfig, DispatchOutcome};
use momenarr_notifications::{NotificationConfig, NotificationHandler};

#[derive(Default)]
struct InMemoryMediaRepo {
    media: Mutex<Vec<Media>>,
}

#[async_trait]
impl MediaRepo for InMemoryMediaRepo {
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
struct InMemoryNzbRepo {
    nzbs: Mutex<Vec<Nzb>>,
}

#[async_trait]
impl NzbRepo for InMemoryNzbRepo {
    async fn insert(&self, nzb: &Nzb) -> Result<()> {
        let mut guard = self.nzbs.lock().unwrap();
        if guard.iter().any(|n| n.release_key == nzb.release_key) {
            return Err(momenarr_core::MomenarrError::DuplicateKey {
                resource: nzb.release_key.clone(),
            });
        }
        guard.push(nzb.clone());
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

struct StaticSearcher {
    results: Vec<SearchResult>,
}

#[async_trait]
impl NzbSearcher for StaticSearcher {
    async fn search_movie(&self, _imdb: &str) -> Result<Vec<SearchResult>> {
        Ok(self.results.clone())
    }
    async fn search_episode(&self, _imdb: &str, _season: i64, _number: i64) -> Result<Vec<SearchResult>> {
        Ok(vec![])
    }
    async fn search_season_pack(&self, _imdb: &str, _season: i64) -> Result<Vec<SearchResult>> {
        Ok(vec![])
    }
}

struct RecordingDownloader {
    next_id: i64,
    appended: Mutex<Vec<AppendRequest>>,
    history: Mutex<Vec<HistoryItem>>,
}

impl RecordingDownloader {
    fn new(next_id: i64) -> Self {
        Self {
            next_id,
            appended: Mutex::new(vec![]),
            history: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn append(&self, req: AppendRequest) -> Result<i64> {
        self.appended.lock().unwrap().push(req);
        Ok(self.next_id)
    }
    async fn list_groups(&self) -> Result<Vec<QueueGroup>> {
        Ok(vec![])
    }
    async fn history(&self, _include_hidden: bool) -> Result<Vec<HistoryItem>> {
        Ok(self.history.lock().unwrap().clone())
    }
    async fn delete_from_history(&self, download_id: i64) -> Result<()> {
        self.history.lock().unwrap().retain(|h| h.nzb_id != download_id);
        Ok(())
    }
}

fn thresholds() -> Thresholds {
    Thresholds {
        title_similarity_min: 0.7,
        year_tolerance: 1,
        min_validation_score: 65,
    }
}

fn selection_config() -> SelectionConfig {
    SelectionConfig {
        thresholds: thresholds(),
        min_quality_score: 0,
        min_total_score: 0,
        guid_prefix: "https://indexer.example/dl/".to_string(),
    }
}

/// S1: a movie's indexer results are searched, scored, and the best (REMUX)
/// candidate is submitted to the downloader, storing its download id.
#[tokio::test]
async fn s1_movie_search_select_dispatch() {
    let media_repo = Arc::new(InMemoryMediaRepo::default());
    let media = Media::new_movie(1, "tt0111161", "The Shawshank Redemption", 1994);
    media_repo.insert(&media).await.unwrap();

    let searcher = Arc::new(StaticSearcher {
        results: vec![
            SearchResult {
                title: "The.Shawshank.Redemption.1994.2160p.REMUX.x265-GRP".to_string(),
                link: "https://indexer.example/dl/remux123".to_string(),
                length: 100,
            },
            SearchResult {
                title: "The.Shawshank.Redemption.1994.1080p.BluRay.x264-GRP".to_string(),
                link: "https://indexer.example/dl/bluray123".to_string(),
                length: 90,
            },
        ],
    });
    let nzb_repo = Arc::new(InMemoryNzbRepo::default());
    let selection = SelectionEngine::new(
        searcher,
        media_repo.clone() as Arc<dyn MediaRepo>,
        nzb_repo.clone() as Arc<dyn NzbRepo>,
        Blacklist::default(),
        selection_config(),
    );

    selection.search_and_store(&media).await.unwrap();
    let best = selection.get_nzb(1).await.unwrap();
    assert_eq!(best.release_key, "remux123");
    assert_eq!(best.total_score, 190);

    let downloader = Arc::new(RecordingDownloader::new(42));
    let dispatcher = Dispatcher::new(
        downloader.clone() as Arc<dyn Downloader>,
        media_repo.clone() as Arc<dyn MediaRepo>,
        DispatcherConfig {
            category: "momenarr".to_string(),
            dupe_mode: "score".to_string(),
            http_timeout: Duration::from_secs(5),
        },
    )
    .unwrap();

    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/dl/remux123"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"nzb-body".to_vec()))
        .mount(&server)
        .await;
    let mut dispatched = best.clone();
    dispatched.link = format!("{}/dl/remux123", server.uri());

    let outcome = dispatcher.create_download(1, &dispatched).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Submitted { download_id: 42 });

    let updated = media_repo.get(1).await.unwrap().unwrap();
    assert_eq!(updated.download_id, 42);
    assert!(!updated.on_disk);
}

/// S3: a download failure marks the chosen NZB failed; the handler
/// re-selects and re-dispatches the next-best candidate, then prunes
/// the downloader's history for the original id.
#[tokio::test]
async fn s3_failure_marks_failed_and_retries_with_next_best() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/dl/bluray123"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"nzb-body".to_vec()))
        .mount(&server)
        .await;

    let media_repo = Arc::new(InMemoryMediaRepo::default());
    let mut media = Media::new_movie(1, "tt0111161", "The Shawshank Redemption", 1994);
    media.download_id = 42;
    media_repo.insert(&media).await.unwrap();

    let nzb_repo = Arc::new(InMemoryNzbRepo::default());
    nzb_repo
        .insert(&Nzb {
            release_key: "remux123".to_string(),
            trakt_id: 1,
            title: "The.Shawshank.Redemption.1994.2160p.REMUX.x265-GRP".to_string(),
            link: "https://indexer.example/dl/remux123".to_string(),
            length: 100,
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
    nzb_repo
        .insert(&Nzb {
            release_key: "bluray123".to_string(),
            trakt_id: 1,
            title: "The.Shawshank.Redemption.1994.1080p.BluRay.x264-GRP".to_string(),
            link: format!("{}/dl/bluray123", server.uri()),
            length: 90,
            failed: false,
            parsed_title: "the shawshank redemption".to_string(),
            year: 1994,
            season: 0,
            episode: 0,
            resolution: "1080P".to_string(),
            source: "BLURAY".to_string(),
            codec: "X264".to_string(),
            proper: false,
            repack: false,
            validation_score: 100,
            quality_score: 70,
            total_score: 170,
        })
        .await
        .unwrap();

    // History carries an unrelated id only: a FAILURE callback means the
    // download never completed, so it never landed in the downloader's
    // history under `media.download_id` (42) in the first place.
    let downloader = Arc::new(RecordingDownloader::new(77));
    downloader.history.lock().unwrap().push(HistoryItem { nzb_id: 99 });

    let dispatcher = Arc::new(
        Dispatcher::new(
            downloader.clone() as Arc<dyn Downloader>,
            media_repo.clone() as Arc<dyn MediaRepo>,
            DispatcherConfig {
                category: "momenarr".to_string(),
                dupe_mode: "score".to_string(),
                http_timeout: Duration::from_secs(5),
            },
        )
        .unwrap(),
    );
    let selection = Arc::new(SelectionEngine::new(
        Arc::new(StaticSearcher { results: vec![] }),
        media_repo.clone() as Arc<dyn MediaRepo>,
        nzb_repo.clone() as Arc<dyn NzbRepo>,
        Blacklist::default(),
        selection_config(),
    ));
    let handler = NotificationHandler::new(
        media_repo.clone() as Arc<dyn MediaRepo>,
        nzb_repo.clone() as Arc<dyn NzbRepo>,
        downloader.clone() as Arc<dyn Downloader>,
        dispatcher,
        selection,
        NotificationConfig {
            category: "momenarr".to_string(),
            retry_count: 2,
            retry_delay: Duration::from_millis(1),
        },
    );

    let notification = momenarr_core::Notification {
        name: "The.Shawshank.Redemption.1994.2160p.REMUX.x265-GRP".to_string(),
        category: "momenarr".to_string(),
        status: "FAILURE".to_string(),
        trakt_id: "1".to_string(),
        dir: String::new(),
    };
    handler.handle(notification).await.unwrap();

    let nzbs = nzb_repo.find_by_trakt_id(1).await.unwrap();
    assert!(nzbs.iter().find(|n| n.release_key == "remux123").unwrap().failed);
    assert!(!nzbs.iter().find(|n| n.release_key == "bluray123").unwrap().failed);

    // the 1080p candidate was re-dispatched
    let appended = downloader.appended.lock().unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].content, b"nzb-body");

    let updated = media_repo.get(1).await.unwrap().unwrap();
    assert_eq!(updated.download_id, 77);

    // history prune exhausted its retries looking for the old id 42, which
    // was never there, and the unrelated entry is untouched
    assert_eq!(downloader.history.lock().unwrap().len(), 1);
    assert_eq!(downloader.history.lock().unwrap()[0].nzb_id, 99);
}
