//! SyncService (C8, §4.8): reconciles `MediaRepo` against the tracking
//! source's watchlist and favorites, inserting newly tracked items and
//! deleting ones that dropped off the remote list.

use std::collections::HashSet;
use std::sync::Arc;

use momenarr_core::{Media, MediaRepo, Result, TrackedMovie, TrackedShow, TrackingSource};
use tracing::{debug, warn};

/// Episode `trakt_id`s aren't exposed by `TrackingSource::episode` (the
/// distilled trait only returns season/number/title), so we synthesize a
/// stable, unique id from the show's id and the episode's position. Bounds
/// season and episode numbers to three decimal digits each, comfortably
/// above any real show's season/episode count.
fn synthetic_episode_trakt_id(show_trakt_id: i64, season: i64, number: i64) -> i64 {
    show_trakt_id * 1_000_000 + season * 1_000 + number
}

pub struct SyncService {
    tracking: Arc<dyn TrackingSource>,
    media_repo: Arc<dyn MediaRepo>,
    next_episodes_count: i64,
}

impl SyncService {
    pub fn new(tracking: Arc<dyn TrackingSource>, media_repo: Arc<dyn MediaRepo>, next_episodes_count: i64) -> Self {
        Self {
            tracking,
            media_repo,
            next_episodes_count,
        }
    }

    /// Full reconciliation pass (§4.8).
    pub async fn sync(&self) -> Result<()> {
        let mut refreshed: HashSet<i64> = HashSet::new();

        for movie in self.tracking.watchlist_movies().await? {
            self.upsert_movie(&movie, &mut refreshed).await;
        }
        for movie in self.tracking.favorite_movies().await? {
            self.upsert_movie(&movie, &mut refreshed).await;
        }

        for show in self.tracking.watchlist_shows().await? {
            self.upsert_next_episodes(&show, 1, &mut refreshed).await;
        }
        for show in self.tracking.favorite_shows().await? {
            self.upsert_next_episodes(&show, self.next_episodes_count, &mut refreshed).await;
        }

        let tracked_ids = self.media_repo.all_trakt_ids().await?;
        for trakt_id in tracked_ids {
            if !refreshed.contains(&trakt_id) {
                if let Err(e) = self.media_repo.delete(trakt_id).await {
                    warn!(trakt_id, error = %e, "failed to delete media no longer tracked");
                }
            }
        }

        Ok(())
    }

    async fn upsert_movie(&self, movie: &TrackedMovie, refreshed: &mut HashSet<i64>) {
        if movie.trakt_id <= 0 || movie.imdb.is_empty() {
            debug!(trakt_id = movie.trakt_id, "skipping movie with invalid id/imdb");
            return;
        }
        refreshed.insert(movie.trakt_id);

        let media = Media::new_movie(movie.trakt_id, movie.imdb.clone(), movie.title.clone(), movie.year);
        match self.media_repo.insert(&media).await {
            Ok(()) => {}
            Err(e) if e.is_duplicate_key() => {}
            Err(e) => warn!(trakt_id = movie.trakt_id, error = %e, "failed to insert movie"),
        }
    }

    /// Walk forward from the show's current watched progress, inserting up
    /// to `count` next episodes. A season rollover (no more episodes found
    /// in the current season) is followed once, then the walk stops.
    async fn upsert_next_episodes(&self, show: &TrackedShow, count: i64, refreshed: &mut HashSet<i64>) {
        if show.trakt_id <= 0 || show.imdb.is_empty() {
            debug!(trakt_id = show.trakt_id, "skipping show with invalid id/imdb");
            return;
        }

        let progress = match self.tracking.watched_progress(show.trakt_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(trakt_id = show.trakt_id, error = %e, "failed to fetch watched progress");
                return;
            }
        };

        let mut season = progress.next_season;
        let mut number = progress.next_number;
        let mut rolled_over = false;
        let mut inserted = 0i64;

        while inserted < count.max(1) {
            if season <= 0 || number <= 0 {
                break;
            }
            let episode = match self.tracking.episode(show.trakt_id, season, number).await {
                Ok(ep) => ep,
                Err(e) => {
                    warn!(trakt_id = show.trakt_id, season, number, error = %e, "failed to fetch episode");
                    break;
                }
            };

            match episode {
                Some(ep) => {
                    let episode_trakt_id = synthetic_episode_trakt_id(show.trakt_id, season, number);
                    refreshed.insert(episode_trakt_id);

                    let media = Media::new_episode(
                        episode_trakt_id,
                        show.imdb.clone(),
                        ep.title,
                        show.year,
                        season,
                        number,
                    );
                    match self.media_repo.insert(&media).await {
                        Ok(()) => {}
                        Err(e) if e.is_duplicate_key() => {}
                        Err(e) => warn!(trakt_id = episode_trakt_id, error = %e, "failed to insert episode"),
                    }

                    inserted += 1;
                    number += 1;
                }
                None => {
                    if rolled_over {
                        break;
                    }
                    rolled_over = true;
                    season += 1;
                    number = 1;
                }
            }
        }
    }
}
