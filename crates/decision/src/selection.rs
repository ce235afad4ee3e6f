//! SelectionEngine (C4, §4.4): search -> filter blacklist -> parse ->
//! validate -> score -> persist surviving candidates keyed by release guid.
//! Exposes "best NZB for media" (`GetNZB`).

use crate::parser::{is_season_pack_title, parse};
use crate::scorer::quality_score;
use crate::validator::{validate, Thresholds};
use momenarr_core::{Blacklist, Media, MediaRepo, MomenarrError, Nzb, NzbRepo, NzbSearcher, Result, SearchResult};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub thresholds: Thresholds,
    pub min_quality_score: i64,
    pub min_total_score: i64,
    /// Stripped from a search result's link to produce the NZB's `release_key`
    /// (§3: "release guid with site prefix stripped").
    pub guid_prefix: String,
}

pub struct SelectionEngine {
    searcher: Arc<dyn NzbSearcher>,
    media_repo: Arc<dyn MediaRepo>,
    nzb_repo: Arc<dyn NzbRepo>,
    blacklist: Blacklist,
    config: SelectionConfig,
}

fn release_key(link: &str, prefix: &str) -> String {
    link.strip_prefix(prefix).unwrap_or(link).to_string()
}

impl SelectionEngine {
    pub fn new(
        searcher: Arc<dyn NzbSearcher>,
        media_repo: Arc<dyn MediaRepo>,
        nzb_repo: Arc<dyn NzbRepo>,
        blacklist: Blacklist,
        config: SelectionConfig,
    ) -> Self {
        Self {
            searcher,
            media_repo,
            nzb_repo,
            blacklist,
            config,
        }
    }

    /// Fetch search candidates per §4.4's search strategy: movies search by
    /// IMDB; episodes try season packs first, falling back to per-episode
    /// search if no season pack survives blacklist+regex filtering.
    async fn candidates(&self, media: &Media) -> Result<Vec<SearchResult>> {
        if media.is_movie() {
            return self.searcher.search_movie(&media.imdb).await;
        }

        let season_packs = self
            .searcher
            .search_season_pack(&media.imdb, media.season)
            .await?;
        let surviving_packs: Vec<SearchResult> = season_packs
            .into_iter()
            .filter(|r| is_season_pack_title(&r.title))
            .filter(|r| !self.blacklist.is_blacklisted(&r.title))
            .collect();

        if !surviving_packs.is_empty() {
            return Ok(surviving_packs);
        }

        self.searcher
            .search_episode(&media.imdb, media.season, media.number)
            .await
    }

    /// Run the full per-candidate pipeline: blacklist -> parse -> validate ->
    /// score -> persist. Any failure rejects that candidate and the loop
    /// continues to the next one; nothing aborts the search (§4.4).
    async fn process_candidate(&self, media: &Media, candidate: &SearchResult) -> Option<()> {
        if self.blacklist.is_blacklisted(&candidate.title) {
            debug!(title = %candidate.title, "rejected by blacklist");
            return None;
        }

        let parsed = match parse(&candidate.title) {
            Ok(p) => p,
            Err(e) => {
                debug!(title = %candidate.title, error = %e, "parse failed");
                return None;
            }
        };

        let validation = match validate(&parsed, media, &self.config.thresholds) {
            Ok(v) => v,
            Err(reason) => {
                debug!(title = %candidate.title, ?reason, "rejected by validator");
                return None;
            }
        };

        let quality = quality_score(&parsed);
        if quality < self.config.min_quality_score {
            debug!(title = %candidate.title, quality, "below min quality score");
            return None;
        }
        let validation_score = validation.total();
        let total_score = validation_score + quality;
        if total_score < self.config.min_total_score {
            debug!(title = %candidate.title, total_score, "below min total score");
            return None;
        }

        let nzb = Nzb {
            release_key: release_key(&candidate.link, &self.config.guid_prefix),
            trakt_id: media.trakt_id,
            title: candidate.title.clone(),
            link: candidate.link.clone(),
            length: candidate.length,
            failed: false,
            parsed_title: parsed.parsed_title,
            year: parsed.year,
            season: parsed.season,
            episode: parsed.episode,
            resolution: parsed.resolution,
            source: parsed.source,
            codec: parsed.codec,
            proper: parsed.proper,
            repack: parsed.repack,
            validation_score,
            quality_score: quality,
            total_score,
        };

        match self.nzb_repo.insert(&nzb).await {
            Ok(()) => Some(()),
            // Duplicate key = treat as success (idempotent, §4.4).
            Err(e) if e.is_duplicate_key() => Some(()),
            Err(e) => {
                warn!(release_key = %nzb.release_key, error = %e, "failed to persist NZB");
                None
            }
        }
    }

    /// Search for `media`, persisting every surviving candidate. Returns the
    /// number of candidates that survived the full pipeline.
    pub async fn search_and_store(&self, media: &Media) -> Result<usize> {
        let candidates = self.candidates(media).await?;
        let mut survived = 0;
        for candidate in &candidates {
            if self.process_candidate(media, candidate).await.is_some() {
                survived += 1;
            }
        }
        Ok(survived)
    }

    /// Fill `NZBRepo` for every `Media` not yet on disk (§4, data flow).
    pub async fn search_and_store_all_missing(&self) -> Result<()> {
        for media in self.media_repo.find_not_on_disk().await? {
            if let Err(e) = self.search_and_store(&media).await {
                warn!(trakt_id = media.trakt_id, error = %e, "search failed for media");
            }
        }
        Ok(())
    }

    /// Best non-failed NZB for `trakt_id` by `total_score`, ties broken by
    /// iteration order (P2). `NoNzbFound` when none qualify.
    pub async fn get_nzb(&self, trakt_id: i64) -> Result<Nzb> {
        let candidates = self.nzb_repo.find_by_trakt_id(trakt_id).await?;
        candidates
            .into_iter()
            .filter(|n| !n.failed)
            .max_by_key(|n| n.total_score)
            .ok_or(MomenarrError::NoNzbFound { trakt_id })
    }
}
