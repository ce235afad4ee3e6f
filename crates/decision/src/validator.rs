//! Validator (C3, §4.3): scores a parsed release against a target `Media`
//! and rejects anything below threshold. Pure and deterministic (P1).

use crate::parser::ParsedRelease;
use momenarr_core::Media;

/// Two-row dynamic-programming Levenshtein distance, O(min(n,m)) memory.
/// Substitution/insertion/deletion costs are all 1.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];

    for (i, &cb) in b.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &ca) in a.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[a.len()]
}

/// Normalized edit-distance similarity in `[0.0, 1.0]`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationScore {
    pub title_score: i64,
    pub year_score: i64,
    pub season_episode_score: i64,
}

impl ValidationScore {
    pub fn total(&self) -> i64 {
        self.title_score + self.year_score + self.season_episode_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TitleSimilarity,
    Year,
    SeasonEpisode,
    BelowThreshold,
}

#[derive(Debug, Clone)]
pub struct Thresholds {
    pub title_similarity_min: f64,
    pub year_tolerance: i64,
    pub min_validation_score: i64,
}

/// Validate a parsed release against `media`, returning the breakdown on
/// success or the reason for rejection (§4.3).
pub fn validate(
    parsed: &ParsedRelease,
    media: &Media,
    thresholds: &Thresholds,
) -> Result<ValidationScore, Rejection> {
    let similarity = title_similarity(&parsed.parsed_title, &media.title.to_lowercase());
    if similarity < thresholds.title_similarity_min {
        return Err(Rejection::TitleSimilarity);
    }
    let title_score = (similarity * 50.0).floor() as i64;

    let year_score = if media.year == 0 {
        30
    } else if parsed.year == 0 {
        if media.is_episode() {
            30
        } else {
            return Err(Rejection::Year);
        }
    } else {
        let delta = (parsed.year - media.year).unsigned_abs() as i64;
        if media.is_episode() && delta > 0 {
            return Err(Rejection::Year);
        }
        match delta {
            0 => 30,
            d if d <= thresholds.year_tolerance => 20,
            d if d <= thresholds.year_tolerance + 1 => 10,
            _ => return Err(Rejection::Year),
        }
    };

    let season_episode_score = if media.is_movie() {
        20
    } else {
        if parsed.season != media.season {
            return Err(Rejection::SeasonEpisode);
        }
        if parsed.episode == 0 {
            10
        } else if parsed.episode == media.number {
            20
        } else {
            return Err(Rejection::SeasonEpisode);
        }
    };

    let score = ValidationScore {
        title_score,
        year_score,
        season_episode_score,
    };
    if score.total() < thresholds.min_validation_score {
        return Err(Rejection::BelowThreshold);
    }
    Ok(score)
}
