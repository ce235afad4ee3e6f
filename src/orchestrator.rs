//! Orchestrator (C6, §4.6): the four-stage pipeline — Sync, Search,
//! Dispatch, Cleanup — run on a fixed timer, once immediately at startup.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use momenarr_core::{HealthState, MediaRepo};
use momenarr_decision::{is_season_pack_title, SelectionEngine};
use momenarr_downloaders::Dispatcher;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cleanup_service::CleanupService;
use crate::sync_service::SyncService;

pub struct Orchestrator {
    media_repo: Arc<dyn MediaRepo>,
    sync_service: Arc<SyncService>,
    selection: Arc<SelectionEngine>,
    dispatcher: Arc<Dispatcher>,
    cleanup: Arc<CleanupService>,
    health: HealthState,
    tick_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        media_repo: Arc<dyn MediaRepo>,
        sync_service: Arc<SyncService>,
        selection: Arc<SelectionEngine>,
        dispatcher: Arc<Dispatcher>,
        cleanup: Arc<CleanupService>,
        health: HealthState,
        tick_interval: Duration,
    ) -> Self {
        Self {
            media_repo,
            sync_service,
            selection,
            dispatcher,
            cleanup,
            health,
            tick_interval,
        }
    }

    /// Runs one cycle immediately, then on `tick_interval` until `cancellation`
    /// trips (§4.6).
    pub async fn run(&self, cancellation: CancellationToken) {
        self.run_cycle().await;

        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.tick().await; // consume the immediate first tick; we already ran one cycle above

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    info!("orchestrator observed cancellation, stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    async fn run_cycle(&self) {
        info!("orchestrator cycle starting");

        if let Err(e) = self.sync_service.sync().await {
            warn!(error = %e, "sync stage failed");
        }

        if let Err(e) = self.selection.search_and_store_all_missing().await {
            warn!(error = %e, "search stage failed");
        }

        self.dispatch_stage().await;

        let cycle_ok = match self.cleanup.run().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "cleanup stage failed");
                false
            }
        };

        self.health
            .record_cycle(cycle_ok, chrono::Utc::now().timestamp());
        info!("orchestrator cycle complete");
    }

    /// Deterministic, dedup-aware dispatch (§4.6): season packs cover every
    /// episode of that season in one submission, so once a season pack is
    /// chosen for one episode, later episodes of the same (imdb, season) are
    /// skipped for the rest of the cycle.
    async fn dispatch_stage(&self) {
        let mut media = match self.media_repo.find_not_on_disk().await {
            Ok(media) => media,
            Err(e) => {
                warn!(error = %e, "failed to list pending media for dispatch");
                return;
            }
        };
        media.sort_by_key(|m| m.trakt_id);

        let mut processed_seasons: HashSet<(String, i64)> = HashSet::new();

        for item in media {
            if item.is_episode() && processed_seasons.contains(&(item.imdb.clone(), item.season)) {
                debug!(trakt_id = item.trakt_id, "skipping: season pack already dispatched this cycle");
                continue;
            }

            let nzb = match self.selection.get_nzb(item.trakt_id).await {
                Ok(nzb) => nzb,
                Err(e) => {
                    debug!(trakt_id = item.trakt_id, error = %e, "no NZB available");
                    continue;
                }
            };

            if is_season_pack_title(&nzb.title) {
                processed_seasons.insert((item.imdb.clone(), item.season));
            }

            if let Err(e) = self.dispatcher.create_download(item.trakt_id, &nzb).await {
                warn!(trakt_id = item.trakt_id, error = %e, "dispatch failed");
            }
        }
    }
}
