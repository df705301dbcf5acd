//! Movie matching
//!
//! Movies have no episode structure, so hits are scored by title similarity
//! against the movie's known titles and penalized for runtime differences.

use super::normalize::{normalize_title, string_similarity};
use crate::catalog::RawHit;
use crate::metadata_retrieval::MovieMetadata;
use serde::Serialize;

const EXACT_SCORE: u8 = 100;
const PARTIAL_SCORE: u8 = 80;
const FUZZY_MIN_SIMILARITY: f64 = 0.8;
/// Runtime differences up to this many minutes are not penalized
const RUNTIME_TOLERANCE_MINUTES: u32 = 10;

/// How closely a hit's title matched the movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchTightness {
    /// Normalized titles are identical
    Exact,
    /// Titles are similar but not identical
    Fuzzy,
    /// One title contains the other as whole words
    Partial,
}

/// A catalog hit accepted as a candidate for a movie.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieMatchResult {
    pub hit: RawHit,
    /// 0-100, higher is better
    pub score: u8,
    pub tightness: MatchTightness,
    /// Absolute runtime difference in minutes, when both runtimes are known
    pub runtime_delta: Option<u32>,
}

/// Scores `hits` against `movie`, best candidates first.
///
/// Hits whose title matches none of the movie's titles are dropped, as are
/// hits shorter than half the known runtime (trailers, clips). Among equal
/// scores, hits mentioning the release year in title or description rank
/// first.
pub fn match_movie(movie: &MovieMetadata, hits: &[RawHit]) -> Vec<MovieMatchResult> {
    let titles: Vec<String> = std::iter::once(&movie.title)
        .chain(movie.original_title.iter())
        .chain(movie.aliases.iter())
        .map(|t| normalize_title(t))
        .filter(|t| !t.is_empty())
        .collect();

    let mut results: Vec<MovieMatchResult> = hits
        .iter()
        .filter_map(|hit| score_hit(hit, &titles, movie.runtime))
        .collect();

    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| mentions_year(&b.hit, movie.year).cmp(&mentions_year(&a.hit, movie.year)))
            .then_with(|| a.runtime_delta.unwrap_or(u32::MAX).cmp(&b.runtime_delta.unwrap_or(u32::MAX)))
            .then_with(|| b.hit.timestamp.cmp(&a.hit.timestamp))
    });
    results
}

fn mentions_year(hit: &RawHit, year: Option<i32>) -> bool {
    year.is_some_and(|year| {
        let year = year.to_string();
        hit.title.contains(&year) || hit.description.contains(&year)
    })
}

fn score_hit(hit: &RawHit, titles: &[String], runtime: Option<u32>) -> Option<MovieMatchResult> {
    let candidate = normalize_title(&hit.title);
    if candidate.is_empty() {
        return None;
    }

    let (score, tightness) = titles
        .iter()
        .filter_map(|title| title_score(&candidate, title))
        .max_by_key(|(score, _)| *score)?;

    let hit_minutes = u32::try_from((hit.duration + 30) / 60).unwrap_or(u32::MAX);
    let runtime_delta = match runtime {
        Some(expected) if hit.duration > 0 => {
            if hit_minutes.saturating_mul(2) < expected {
                return None;
            }
            Some(hit_minutes.abs_diff(expected))
        }
        _ => None,
    };

    let penalty = runtime_delta
        .map(|delta| delta.saturating_sub(RUNTIME_TOLERANCE_MINUTES))
        .unwrap_or(0);
    let score = u32::from(score).saturating_sub(penalty) as u8;

    Some(MovieMatchResult {
        hit: hit.clone(),
        score,
        tightness,
        runtime_delta,
    })
}

fn title_score(candidate: &str, title: &str) -> Option<(u8, MatchTightness)> {
    if candidate == title {
        return Some((EXACT_SCORE, MatchTightness::Exact));
    }

    let (shorter, longer) = if candidate.len() < title.len() {
        (candidate, title)
    } else {
        (title, candidate)
    };
    if format!(".{longer}.").contains(&format!(".{shorter}.")) {
        return Some((PARTIAL_SCORE, MatchTightness::Partial));
    }

    let similarity = string_similarity(candidate, title);
    (similarity >= FUZZY_MIN_SIMILARITY)
        .then(|| ((similarity * 100.0).round() as u8, MatchTightness::Fuzzy))
}
