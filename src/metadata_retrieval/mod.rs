/// Data structures and traits for show metadata retrieval.
///
/// This module provides structures to represent shows and their episodes
/// with their associated metadata (names, air dates, runtimes), as well as
/// traits for implementing metadata providers.
mod cached;
mod chain;
mod tvmaze;
mod tvmaze_types;

pub use cached::CachedMetadataProvider;
pub use chain::ProviderChain;
pub use tvmaze::TvMazeProvider;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Season values at or above this are calendar years, never season numbers.
pub const FIRST_YEAR_SEASON: u32 = 1900;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// Represents a single episode of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// The season number this episode belongs to (0 for specials)
    pub season_number: u32,
    /// The episode number within the season
    pub episode_number: u32,
    /// The episode title
    pub name: String,
    /// The original air date, if known
    pub air_date: Option<NaiveDate>,
    /// Runtime in minutes, if known
    pub runtime: Option<u32>,
    /// A brief summary or description of the episode
    #[serde(default)]
    pub summary: String,
}

impl Episode {
    /// The (season, episode) pair identifying this episode within its show
    pub fn key(&self) -> (u32, u32) {
        (self.season_number, self.episode_number)
    }

    /// Whether the episode aired in the given calendar year
    pub fn aired_in(&self, year: u32) -> bool {
        self.air_date
            .is_some_and(|date| u32::try_from(date.year()).is_ok_and(|y| y == year))
    }
}

/// A show's identity and full known episode list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowMetadata {
    /// Canonical show identifier (TVDB id)
    pub id: u32,
    /// The original (usually English) name
    pub name: String,
    /// The German name, if the provider knows one
    pub german_name: Option<String>,
    /// Further localized names
    #[serde(default)]
    pub aliases: Vec<String>,
    /// All known episodes, ordered by season and episode number
    pub episodes: Vec<Episode>,
}

impl ShowMetadata {
    /// The name used when presenting matches, preferring the German name
    pub fn display_name(&self) -> &str {
        self.german_name.as_deref().unwrap_or(&self.name)
    }

    /// All known names: German name first, then original name, then aliases
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let candidates = self
            .german_name
            .iter()
            .chain(std::iter::once(&self.name))
            .chain(self.aliases.iter());

        for name in candidates {
            if !name.trim().is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.as_str());
            }
        }
        names
    }

    /// Finds an episode by season and episode number
    pub fn episode(&self, season: u32, episode: u32) -> Option<&Episode> {
        self.episodes
            .iter()
            .find(|e| e.season_number == season && e.episode_number == episode)
    }

    /// All episodes belonging to the given season
    pub fn episodes_in_season(&self, season: u32) -> impl Iterator<Item = &Episode> {
        self.episodes
            .iter()
            .filter(move |e| e.season_number == season)
    }

    /// All episodes that aired in the given calendar year
    pub fn episodes_in_year(&self, year: u32) -> impl Iterator<Item = &Episode> {
        self.episodes.iter().filter(move |e| e.aired_in(year))
    }

    /// All episodes that aired on the given calendar day
    pub fn episodes_on(&self, date: NaiveDate) -> impl Iterator<Item = &Episode> {
        self.episodes
            .iter()
            .filter(move |e| e.air_date == Some(date))
    }

    /// The n-th regular episode (1-based), ignoring specials
    pub fn absolute_episode(&self, number: u32) -> Option<&Episode> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        let mut regular: Vec<&Episode> = self
            .episodes
            .iter()
            .filter(|e| e.season_number >= 1)
            .collect();
        regular.sort_by_key(|e| e.key());
        regular.get(index).copied()
    }
}

/// Reference record for the movie matching flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    /// The localized title
    pub title: String,
    /// The original title, if different
    pub original_title: Option<String>,
    /// Further alternative titles
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Release year
    pub year: Option<i32>,
    /// Runtime in minutes
    pub runtime: Option<u32>,
}

/// Trait for metadata providers that can fetch show information.
///
/// Implementors of this trait can retrieve episode metadata from various
/// sources such as TVMaze, TVDB or TMDB.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short provider name, used for logging and cache separation
    fn name(&self) -> &str;

    /// How long fetched metadata from this provider stays fresh
    fn cache_ttl(&self) -> Duration;

    /// Fetches metadata for a show.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the provider does not know the show, the metadata
    /// otherwise, or a MetadataRetrievalError on transport/parse failures.
    async fn fetch_show(&self, show_id: u32)
    -> Result<Option<ShowMetadata>, MetadataRetrievalError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn episode(season: u32, number: u32, name: &str, air_date: Option<&str>) -> Episode {
        Episode {
            season_number: season,
            episode_number: number,
            name: name.to_string(),
            air_date: air_date.map(|d| d.parse().unwrap()),
            runtime: None,
            summary: String::new(),
        }
    }

    pub(crate) fn show(episodes: Vec<Episode>) -> ShowMetadata {
        ShowMetadata {
            id: 1234,
            name: "Crime Scene".to_string(),
            german_name: Some("Tatort".to_string()),
            aliases: vec!["Tatort Klassiker".to_string()],
            episodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_names_are_unique_and_ordered() {
        let mut s = show(Vec::new());
        s.aliases.push("TATORT".to_string());
        assert_eq!(s.names(), vec!["Tatort", "Crime Scene", "Tatort Klassiker"]);
        assert_eq!(s.display_name(), "Tatort");
    }

    #[test]
    fn test_absolute_episode_skips_specials() {
        let s = show(vec![
            episode(0, 1, "Special", None),
            episode(1, 1, "Eins", None),
            episode(1, 2, "Zwei", None),
            episode(2, 1, "Drei", None),
        ]);
        assert_eq!(s.absolute_episode(3).map(|e| e.name.as_str()), Some("Drei"));
        assert_eq!(s.absolute_episode(0), None);
        assert_eq!(s.absolute_episode(4), None);
    }

    #[test]
    fn test_episodes_in_year() {
        let s = show(vec![
            episode(1, 1, "A", Some("2019-12-31")),
            episode(1, 2, "B", Some("2020-01-01")),
            episode(1, 3, "C", None),
        ]);
        let names: Vec<&str> = s.episodes_in_year(2020).map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
    }
}
