//! Matching strategies
//!
//! Each strategy turns a hit into one episode of the show, or nothing.
//! Which strategy runs is decided by the rule set alone; strategies are
//! never combined.

use super::dates::parse_title_date;
use super::normalize::{normalize_title, string_similarity};
use crate::catalog::RawHit;
use crate::metadata_retrieval::{Episode, FIRST_YEAR_SEASON, ShowMetadata};
use crate::ruleset::{MatchingStrategy, Ruleset, build_title, compile_pattern};

/// Fuzzy matches for exact-title rule sets must be at least this similar.
const EXACT_FUZZY_FLOOR: f64 = 0.9;

/// A successful strategy outcome.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StrategyMatch<'a> {
    pub episode: &'a Episode,
    /// The text that justified the match
    pub fragment: String,
}

/// Runs the rule set's strategy against `hit`.
pub(crate) fn apply_strategy<'a>(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &'a ShowMetadata,
    default_threshold: f64,
) -> Option<StrategyMatch<'a>> {
    let threshold = ruleset.title_threshold.unwrap_or(default_threshold);

    match ruleset.matching_strategy {
        MatchingStrategy::SeasonAndEpisodeNumber => season_and_episode_number(hit, ruleset, show),
        MatchingStrategy::ItemTitleIncludes => item_title_includes(hit, ruleset, show, threshold),
        MatchingStrategy::ItemTitleExact => item_title_exact(hit, ruleset, show, threshold),
        MatchingStrategy::ItemTitleEqualsAirdate => item_title_equals_airdate(hit, ruleset, show),
    }
}

/// The text a strategy works on: the built title, or the plain hit title
/// for rule sets without title rules.
fn candidate_title(hit: &RawHit, ruleset: &Ruleset) -> Option<String> {
    if ruleset.title_rules.is_empty() {
        return Some(hit.title.clone());
    }
    build_title(hit, &ruleset.title_rules)
}

/// First capture group (or whole match) of `pattern`, parsed as a number
fn extract_number(pattern: &str, text: &str) -> Option<u32> {
    let regex = compile_pattern(pattern)?;
    let captures = regex.captures(text).ok()??;
    let found = captures.get(1).or_else(|| captures.get(0))?;
    found.as_str().trim().parse().ok()
}

fn season_and_episode_number<'a>(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &'a ShowMetadata,
) -> Option<StrategyMatch<'a>> {
    let text = candidate_title(hit, ruleset)?;
    let episode_number = extract_number(ruleset.episode_regex.as_deref()?, &text)?;

    let Some(season_regex) = ruleset.season_regex.as_deref() else {
        // No season regex: the number counts episodes across all seasons
        let episode = show.absolute_episode(episode_number)?;
        return Some(StrategyMatch {
            episode,
            fragment: format!("E{episode_number:02}"),
        });
    };

    let season = extract_number(season_regex, &text)?;
    let episode = if season >= FIRST_YEAR_SEASON {
        show.episodes_in_year(season)
            .find(|e| e.episode_number == episode_number)?
    } else {
        show.episode(season, episode_number)?
    };

    Some(StrategyMatch {
        episode,
        fragment: format!("S{season:02}E{episode_number:02}"),
    })
}

fn item_title_includes<'a>(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &'a ShowMetadata,
    threshold: f64,
) -> Option<StrategyMatch<'a>> {
    let candidate = candidate_title(hit, ruleset)?;
    let normalized = normalize_title(&candidate);
    if normalized.is_empty() {
        return None;
    }

    // The longest contained name is the most specific one ("Teil 10" over "Teil 1")
    let mut contained: Option<(&Episode, usize)> = None;
    for episode in &show.episodes {
        let name = normalize_title(&episode.name);
        if name.is_empty() || !normalized.contains(&name) {
            continue;
        }
        if contained.is_none_or(|(_, len)| name.len() > len) {
            contained = Some((episode, name.len()));
        }
    }

    let episode = match contained {
        Some((episode, _)) => episode,
        None if threshold < 1.0 => best_similarity(&normalized, &show.episodes)
            .filter(|(_, score)| *score >= threshold)
            .map(|(episode, _)| episode)?,
        None => return None,
    };

    Some(StrategyMatch {
        episode,
        fragment: candidate,
    })
}

fn item_title_exact<'a>(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &'a ShowMetadata,
    threshold: f64,
) -> Option<StrategyMatch<'a>> {
    let candidate = candidate_title(hit, ruleset)?;
    let normalized = normalize_title(&candidate);
    if normalized.is_empty() {
        return None;
    }

    let mut tied: Vec<&Episode> = show
        .episodes
        .iter()
        .filter(|e| normalize_title(&e.name) == normalized)
        .collect();

    if tied.is_empty() && threshold < 1.0 {
        let floor = threshold.max(EXACT_FUZZY_FLOOR);
        let scored: Vec<(&Episode, f64)> = show
            .episodes
            .iter()
            .map(|e| (e, string_similarity(&normalize_title(&e.name), &normalized)))
            .filter(|(_, score)| *score > floor)
            .collect();

        let best = scored.iter().map(|(_, score)| *score).fold(f64::MIN, f64::max);
        tied = scored
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(e, _)| e)
            .collect();
    }

    let episode = break_tie(tied, hit)?;
    Some(StrategyMatch {
        episode,
        fragment: candidate,
    })
}

/// Picks one of several equally good episodes.
///
/// An episode that aired on the hit's catalog day wins; otherwise the most
/// recently aired one (first in list order among equals).
fn break_tie<'a>(tied: Vec<&'a Episode>, hit: &RawHit) -> Option<&'a Episode> {
    if tied.len() <= 1 {
        return tied.first().copied();
    }

    if let Some(date) = hit.catalog_date() {
        if let Some(episode) = tied.iter().find(|e| e.air_date == Some(date)) {
            return Some(episode);
        }
    }

    tied.into_iter()
        .fold(None, |best: Option<&Episode>, e| match best {
            Some(b) if b.air_date >= e.air_date => Some(b),
            _ => Some(e),
        })
}

fn item_title_equals_airdate<'a>(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &'a ShowMetadata,
) -> Option<StrategyMatch<'a>> {
    let candidate = candidate_title(hit, ruleset)?;
    let date = parse_title_date(&candidate)?;
    let episode = show.episodes_on(date).next()?;

    Some(StrategyMatch {
        episode,
        fragment: candidate,
    })
}

/// The episode whose normalized name is most similar to `normalized`,
/// first in list order among equals.
fn best_similarity<'a>(normalized: &str, episodes: &'a [Episode]) -> Option<(&'a Episode, f64)> {
    let mut best: Option<(&Episode, f64)> = None;
    for episode in episodes {
        let name = normalize_title(&episode.name);
        if name.is_empty() {
            continue;
        }
        let score = string_similarity(&name, normalized);
        if best.is_none_or(|(_, b)| score > b) {
            best = Some((episode, score));
        }
    }
    best
}
