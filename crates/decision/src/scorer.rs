//! Quality scorer (C2, §4.2). A pure function over a `ParsedRelease`:
//! `quality_score = resolution + source + codec + flags`.

use crate::parser::ParsedRelease;

fn resolution_score(resolution: &str) -> i64 {
    match resolution.to_uppercase().as_str() {
        s if s.contains("2160P") || s.contains("4K") => 40,
        s if s.contains("1080P") => 30,
        s if s.contains("720P") => 20,
        s if s.contains("576P") || s.contains("480P") => 10,
        "" => 0,
        _ => 5,
    }
}

fn source_score(source: &str) -> i64 {
    match source.to_uppercase().as_str() {
        s if s.contains("REMUX") => 30,
        s if s.contains("BLURAY") || s.contains("BDRIP") => 25,
        s if s.contains("WEB-DL") || s.contains("WEBDL") => 20,
        s if s.contains("WEBRIP") => 15,
        s if s.contains("HDTV") => 10,
        "" => 0,
        _ => 5,
    }
}

fn codec_score(codec: &str) -> i64 {
    match codec.to_uppercase().as_str() {
        s if s.contains("X265") || s.contains("HEVC") => 20,
        s if s.contains("X264") || s.contains("AVC") => 15,
        s if s.contains("XVID") => 10,
        "" => 0,
        _ => 5,
    }
}

fn flags_score(proper: bool, repack: bool) -> i64 {
    let mut score = 0;
    if proper {
        score += 5;
    }
    if repack {
        score += 5;
    }
    score.min(10)
}

/// Score a parsed release's technical quality (§4.2). A release with no
/// recognized fields at all (empty resolution/source/codec, no flags)
/// scores zero rather than falling into the "else" bucket of each
/// dimension — the "else" scores only apply once some unrecognized-but-
/// present value was parsed.
pub fn quality_score(parsed: &ParsedRelease) -> i64 {
    resolution_score(&parsed.resolution)
        + source_score(&parsed.source)
        + codec_score(&parsed.codec)
        + flags_score(parsed.proper, parsed.repack)
}
