//! Release title parser (C1, §4.1).
//!
//! Parses a raw release title such as `Show.Name.S02E05.2160p.REMUX.x265-GROUP`
//! into structured fields. Deterministic and side-effect-free: no I/O, no
//! shared state. String fields come back uppercased, except `parsed_title`
//! which is lowercased and trimmed.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("release title is empty")]
    Empty,
}

/// A release title broken into its structured fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRelease {
    pub parsed_title: String,
    pub year: i64,
    pub season: i64,
    pub episode: i64,
    pub resolution: String,
    pub source: String,
    pub codec: String,
    pub proper: bool,
    pub repack: bool,
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[.\s(\[])(19\d{2}|20\d{2})(?:$|[.\s)\]])").unwrap());
static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S(\d{1,2})E(\d{1,3})").unwrap());
static SEASON_PACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S(\d{1,2})(?!\d)(?:[^E]|$)").unwrap());
static SEASON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Season[.\s]+(\d{1,2})").unwrap());

static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(2160P|4K|1080P|720P|576P|480P)\b").unwrap());
static SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(REMUX|BLU-?RAY|BDRIP|WEB-?DL|WEBRIP|HDTV)\b").unwrap()
});
static CODEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(X265|HEVC|X264|AVC|XVID)\b").unwrap());
static PROPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPROPER\b").unwrap());
static REPACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bREPACK\b").unwrap());

/// Detects a season pack title: has season notation AND no episode marker (§4.4).
pub static HAS_SEASON_NOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S\d{1,2}|Season[.\s]+\d+").unwrap());
pub static HAS_EPISODE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)E\d{1,2}").unwrap());

/// True if `title` looks like a season pack: season notation present and no
/// per-episode marker (the regex pair used by both SelectionEngine search
/// filtering and the Orchestrator's season-pack dedup detector, §4.4/§4.6).
pub fn is_season_pack_title(title: &str) -> bool {
    HAS_SEASON_NOTATION_RE.is_match(title) && !HAS_EPISODE_MARKER_RE.is_match(title)
}

fn normalize_resolution(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "4K" => "2160P".to_string(),
        other => other.to_string(),
    }
}

fn normalize_source(raw: &str) -> String {
    match raw.to_uppercase().replace('-', "").as_str() {
        "BLURAY" => "BLURAY".to_string(),
        "BDRIP" => "BDRIP".to_string(),
        "WEBDL" => "WEB-DL".to_string(),
        "WEBRIP" => "WEBRIP".to_string(),
        "HDTV" => "HDTV".to_string(),
        "REMUX" => "REMUX".to_string(),
        other => other.to_string(),
    }
}

fn normalize_codec(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "X265" | "HEVC" => "X265".to_string(),
        "X264" | "AVC" => "X264".to_string(),
        "XVID" => "XVID".to_string(),
        other => other.to_string(),
    }
}

/// Derive `parsed_title` by trimming at the first recognized technical
/// marker (year, season/episode, resolution, source, codec) and cleaning up
/// separators. Lowercased and trimmed per §4.1.
fn extract_title(raw: &str) -> String {
    let spaced = raw.replace('.', " ").replace('_', " ");

    let mut cut_at = spaced.len();
    for re in [&*YEAR_RE, &*SEASON_EPISODE_RE, &*SEASON_PACK_RE, &*SEASON_WORD_RE] {
        if let Some(m) = re.find(&spaced) {
            cut_at = cut_at.min(m.start());
        }
    }
    for re in [&*RESOLUTION_RE, &*SOURCE_RE, &*CODEC_RE] {
        if let Some(m) = re.find(&spaced) {
            cut_at = cut_at.min(m.start());
        }
    }

    spaced[..cut_at]
        .trim()
        .trim_end_matches(['-', '.'])
        .trim()
        .to_lowercase()
}

/// Parse a release title (§4.1). Fails only on unrecoverable input (empty
/// string); every other field defaults to 0/empty/false when absent.
pub fn parse(title: &str) -> Result<ParsedRelease, ParseError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut year = 0;
    if let Some(caps) = YEAR_RE.captures(trimmed) {
        year = caps[1].parse().unwrap_or(0);
    }

    let mut season = 0;
    let mut episode = 0;
    if let Some(caps) = SEASON_EPISODE_RE.captures(trimmed) {
        season = caps[1].parse().unwrap_or(0);
        episode = caps[2].parse().unwrap_or(0);
    } else if let Some(caps) = SEASON_PACK_RE.captures(trimmed) {
        season = caps[1].parse().unwrap_or(0);
    } else if let Some(caps) = SEASON_WORD_RE.captures(trimmed) {
        season = caps[1].parse().unwrap_or(0);
    }

    let resolution = RESOLUTION_RE
        .find(trimmed)
        .map(|m| normalize_resolution(m.as_str()))
        .unwrap_or_default();
    let source = SOURCE_RE
        .find(trimmed)
        .map(|m| normalize_source(m.as_str()))
        .unwrap_or_default();
    let codec = CODEC_RE
        .find(trimmed)
        .map(|m| normalize_codec(m.as_str()))
        .unwrap_or_default();
    let proper = PROPER_RE.is_match(trimmed);
    let repack = REPACK_RE.is_match(trimmed);

    Ok(ParsedRelease {
        parsed_title: extract_title(trimmed),
        year,
        season,
        episode,
        resolution,
        source,
        codec,
        proper,
        repack,
    })
}
