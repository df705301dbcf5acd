//! Desired-episode selection
//!
//! Translates the caller's season/episode request into the set of episodes
//! a search may return.

use crate::metadata_retrieval::{Episode, FIRST_YEAR_SEASON, ShowMetadata};
use chrono::NaiveDate;
use std::collections::HashSet;

/// The episodes a caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredEpisodes {
    /// No season was requested; every episode is acceptable
    Unrestricted,
    /// Only these episodes are acceptable (possibly none)
    Only(Vec<Episode>),
}

impl DesiredEpisodes {
    /// True if the request can never be satisfied
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(episodes) if episodes.is_empty())
    }

    /// Whether `episode` belongs to the requested set
    pub fn admits(&self, episode: &Episode) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Only(episodes) => episodes.iter().any(|e| e.key() == episode.key()),
        }
    }
}

/// Computes the desired episode set for a request.
///
/// - no season: unrestricted
/// - year season with a "MM/DD" (or "YYYY/MM/DD") episode: episodes aired that day
/// - numeric season and episode: exactly that episode
/// - season only: the whole season, plus everything aired that year for
///   four-digit seasons
/// - anything unparseable: the empty set
pub fn desired_episodes(
    show: &ShowMetadata,
    season: Option<&str>,
    episode: Option<&str>,
) -> DesiredEpisodes {
    let Some(season) = season.map(str::trim).filter(|s| !s.is_empty()) else {
        return DesiredEpisodes::Unrestricted;
    };
    let Ok(season_number) = season.parse::<u32>() else {
        return DesiredEpisodes::Only(Vec::new());
    };
    let is_year = season.len() == 4 && season_number >= FIRST_YEAR_SEASON;
    let episode = episode.map(str::trim).filter(|e| !e.is_empty());

    let selected: Vec<&Episode> = match episode {
        Some(token) if token.contains('/') => match daily_date(season_number, token) {
            Some(date) if is_year => show.episodes_on(date).collect(),
            _ => Vec::new(),
        },
        Some(token) => match token.parse::<u32>() {
            Ok(number) => show
                .episode(season_number, number)
                .or_else(|| {
                    is_year
                        .then(|| {
                            show.episodes_in_year(season_number)
                                .find(|e| e.episode_number == number)
                        })
                        .flatten()
                })
                .into_iter()
                .collect(),
            Err(_) => Vec::new(),
        },
        None => {
            let mut selected: Vec<&Episode> = show.episodes_in_season(season_number).collect();
            if is_year {
                selected.extend(show.episodes_in_year(season_number));
            }
            selected
        }
    };

    let mut seen = HashSet::new();
    DesiredEpisodes::Only(
        selected
            .into_iter()
            .filter(|e| seen.insert(e.key()))
            .cloned()
            .collect(),
    )
}

/// Parses "MM/DD" within `year`, or a full "YYYY/MM/DD"
fn daily_date(year: u32, token: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split('/').map(str::trim).collect();
    let (year, month, day) = match parts.as_slice() {
        [month, day] => (i32::try_from(year).ok()?, *month, *day),
        [year, month, day] => (year.parse().ok()?, *month, *day),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}
