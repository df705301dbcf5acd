//! Episode and movie matching
//!
//! This module turns catalog hits into matched episodes. The pipeline per
//! hit is: select applicable rule sets, check their filters, run the rule
//! set's strategy. Matches are then restricted to the desired episodes,
//! deduplicated and ranked.
mod dates;
mod desired;
mod movie;
mod normalize;
mod strategies;

pub use dates::parse_title_date;
pub use desired::{DesiredEpisodes, desired_episodes};
pub use movie::{MatchTightness, MovieMatchResult, match_movie};
pub use normalize::{normalize_title, string_similarity};

pub(crate) use dates::GERMAN_MONTHS;

use crate::catalog::RawHit;
use crate::metadata_retrieval::{Episode, ShowMetadata};
use crate::ruleset::{Ruleset, passes_all};
use serde::Serialize;
use std::collections::HashSet;
use strategies::apply_strategy;
use tracing::trace;

/// A catalog hit resolved to one episode of a show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedEpisodeInfo {
    /// The catalog hit
    pub hit: RawHit,
    /// The episode it was resolved to
    pub episode: Episode,
    /// Display name of the show
    pub show_name: String,
    /// Canonical show identifier
    pub show_id: u32,
    /// The text that justified the match (episode marker or extracted title)
    pub matched_fragment: String,
    /// Identifier of the rule set that produced the match
    pub ruleset_id: String,
}

/// Matches a single hit against a single rule set.
///
/// Returns `None` if the rule set does not cover the hit's topic or show,
/// a filter rejects the hit, or the strategy finds no episode.
pub fn match_hit(
    hit: &RawHit,
    ruleset: &Ruleset,
    show: &ShowMetadata,
    default_threshold: f64,
) -> Option<MatchedEpisodeInfo> {
    if ruleset.show_id() != show.id || !ruleset.covers_topic(&hit.topic) {
        return None;
    }
    if !passes_all(hit, &ruleset.filters) {
        trace!(ruleset = %ruleset.id, title = %hit.title, "hit rejected by filters");
        return None;
    }

    let found = apply_strategy(hit, ruleset, show, default_threshold)?;
    Some(MatchedEpisodeInfo {
        hit: hit.clone(),
        episode: found.episode.clone(),
        show_name: show.display_name().to_string(),
        show_id: show.id,
        matched_fragment: found.fragment,
        ruleset_id: ruleset.id.clone(),
    })
}

/// Matches `hits` against `rulesets` and returns the ranked episode list.
///
/// Rule sets are tried per hit in the given order and the first match wins.
/// Matches outside `desired` are dropped, hits sharing a video URL are
/// reported once, and results are ordered by season and episode, newest
/// catalog entry first within an episode.
pub fn match_hits(
    desired: &DesiredEpisodes,
    show: &ShowMetadata,
    hits: &[RawHit],
    rulesets: &[Ruleset],
    default_threshold: f64,
) -> Vec<MatchedEpisodeInfo> {
    if desired.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<MatchedEpisodeInfo> = hits
        .iter()
        .filter_map(|hit| {
            rulesets
                .iter()
                .find_map(|ruleset| match_hit(hit, ruleset, show, default_threshold))
        })
        .filter(|m| desired.admits(&m.episode))
        .collect();

    rank(&mut matches);
    dedupe(matches)
}

/// Orders by (season, episode) ascending, newest catalog entry first
pub(crate) fn rank(matches: &mut [MatchedEpisodeInfo]) {
    matches.sort_by(|a, b| {
        a.episode
            .key()
            .cmp(&b.episode.key())
            .then_with(|| b.hit.timestamp.cmp(&a.hit.timestamp))
    });
}

/// Keeps the first match per video URL
pub(crate) fn dedupe(matches: Vec<MatchedEpisodeInfo>) -> Vec<MatchedEpisodeInfo> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| {
            let url = m.hit.best_url();
            url.is_empty() || seen.insert(url.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::test_support::{episode, show};
    use crate::ruleset::{Filter, FilterOperator, MatchingStrategy, RulesetShow, TitleRule};

    fn tatort_ruleset() -> Ruleset {
        Ruleset {
            id: "tatort".to_string(),
            topic: "Tatort".to_string(),
            show: RulesetShow {
                tvdb_id: 1234,
                name: "Tatort".to_string(),
            },
            priority: 0,
            filters: vec![Filter {
                attribute: "duration".to_string(),
                operator: FilterOperator::GreaterThan,
                value: "80".to_string(),
            }],
            title_rules: vec![TitleRule::Regex {
                field: "title".to_string(),
                pattern: r"^(.+?)(?:\s*\([^)]*\))?$".to_string(),
            }],
            season_regex: None,
            episode_regex: None,
            matching_strategy: MatchingStrategy::ItemTitleExact,
            title_threshold: None,
        }
    }

    fn hit(title: &str, timestamp: i64, url: &str) -> RawHit {
        RawHit {
            channel: "ARD".to_string(),
            topic: "Tatort".to_string(),
            title: title.to_string(),
            timestamp,
            duration: 5400,
            url_video: url.to_string(),
            ..Default::default()
        }
    }

    fn tatort() -> ShowMetadata {
        show(vec![
            episode(2024, 1, "Der Fall", Some("2024-01-07")),
            episode(2024, 2, "Die Falle", Some("2024-01-14")),
        ])
    }

    #[test]
    fn test_match_hits_end_to_end() {
        let s = tatort();
        let hits = vec![
            hit("Die Falle", 300, "https://a/2"),
            hit("Der Fall (Audiodeskription)", 100, "https://a/1"),
            hit("Der Fall", 200, "https://a/1b"),
            hit("Ganz anderer Titel", 400, "https://a/3"),
        ];

        let matches = match_hits(
            &DesiredEpisodes::Unrestricted,
            &s,
            &hits,
            &[tatort_ruleset()],
            1.0,
        );

        let found: Vec<(u32, i64)> = matches
            .iter()
            .map(|m| (m.episode.episode_number, m.hit.timestamp))
            .collect();
        assert_eq!(found, vec![(1, 200), (1, 100), (2, 300)]);
        assert_eq!(matches[0].show_name, "Tatort");
        assert_eq!(matches[0].ruleset_id, "tatort");
        assert_eq!(matches[1].matched_fragment, "Der Fall");
    }

    #[test]
    fn test_desired_set_and_dedupe() {
        let s = tatort();
        let hits = vec![
            hit("Der Fall", 100, "https://a/1"),
            hit("Der Fall", 200, "https://a/1"),
            hit("Die Falle", 300, "https://a/2"),
        ];
        let desired = desired_episodes(&s, Some("2024"), Some("1"));

        let matches = match_hits(&desired, &s, &hits, &[tatort_ruleset()], 1.0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].hit.timestamp, 200);
    }

    #[test]
    fn test_filters_topic_and_show_gate_the_rule_set() {
        let s = tatort();
        let ruleset = tatort_ruleset();

        let mut short = hit("Der Fall", 100, "u");
        short.duration = 60;
        assert!(match_hit(&short, &ruleset, &s, 1.0).is_none());

        let mut other_topic = hit("Der Fall", 100, "u");
        other_topic.topic = "Polizeiruf 110".to_string();
        assert!(match_hit(&other_topic, &ruleset, &s, 1.0).is_none());

        let mut other_show = ruleset.clone();
        other_show.show.tvdb_id = 1;
        assert!(match_hit(&hit("Der Fall", 100, "u"), &other_show, &s, 1.0).is_none());

        assert!(match_hit(&hit("Der Fall", 100, "u"), &ruleset, &s, 1.0).is_some());
    }

    #[test]
    fn test_first_matching_ruleset_wins() {
        let s = tatort();
        let mut by_number = tatort_ruleset();
        by_number.id = "numbers".to_string();
        by_number.matching_strategy = MatchingStrategy::SeasonAndEpisodeNumber;
        by_number.title_rules.clear();
        by_number.episode_regex = Some(r"Folge (\d+)".to_string());

        let hits = vec![hit("Der Fall", 100, "https://a/1"), hit("Folge 2", 200, "https://a/2")];
        let matches = match_hits(
            &DesiredEpisodes::Unrestricted,
            &s,
            &hits,
            &[by_number, tatort_ruleset()],
            1.0,
        );

        let ids: Vec<&str> = matches.iter().map(|m| m.ruleset_id.as_str()).collect();
        assert_eq!(ids, vec!["tatort", "numbers"]);
    }

    #[test]
    fn test_impossible_request_short_circuits() {
        let s = tatort();
        let desired = desired_episodes(&s, Some("2020"), None);
        let matches = match_hits(&desired, &s, &[hit("Der Fall", 1, "u")], &[tatort_ruleset()], 1.0);
        assert!(matches.is_empty());
    }
}
