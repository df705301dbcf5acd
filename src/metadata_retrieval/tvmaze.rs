/// TVMaze metadata provider implementation.
use super::tvmaze_types::{TvMazeEpisode, TvMazeShow, TvMazeShowRef};
use super::{Episode, MetadataProvider, MetadataRetrievalError, ShowMetadata};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

/// Country codes whose AKAs count as German names.
const GERMAN_COUNTRIES: &[&str] = &["DE", "AT", "CH"];

/// Metadata provider for the TVMaze API.
///
/// This provider resolves a TVDB id through the lookup endpoint and then
/// fetches the show from https://api.tvmaze.com with embedded episodes and
/// alternative names.
pub struct TvMazeProvider {
    client: reqwest::Client,
    base_url: String,
    cache_ttl: Duration,
}

impl TvMazeProvider {
    /// Creates a new TVMaze provider instance.
    pub fn new(base_url: &str, cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_ttl,
        }
    }

    /// Converts a TVMaze episode to our internal Episode structure.
    ///
    /// Episodes without a number cannot be addressed and are dropped.
    fn convert_episode(tvmaze_episode: TvMazeEpisode) -> Option<Episode> {
        Some(Episode {
            season_number: tvmaze_episode.season,
            episode_number: tvmaze_episode.number?,
            name: tvmaze_episode.name.unwrap_or_default(),
            air_date: tvmaze_episode
                .airdate
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            runtime: tvmaze_episode.runtime,
            summary: tvmaze_episode
                .summary
                .map(|s| nanohtml2text::html2text(&s).trim().to_string())
                .unwrap_or_default(),
        })
    }

    /// Converts TVMaze show data to our internal ShowMetadata structure.
    fn convert_to_show(show_id: u32, tvmaze_show: TvMazeShow) -> ShowMetadata {
        let embedded = tvmaze_show.embedded.unwrap_or_default();

        let german_akas: Vec<String> = embedded
            .akas
            .into_iter()
            .filter(|aka| {
                aka.country
                    .as_ref()
                    .is_some_and(|c| GERMAN_COUNTRIES.contains(&c.code.as_str()))
            })
            .map(|aka| aka.name)
            .collect();

        // German productions carry their German name as the main name
        let is_german = tvmaze_show.language.as_deref() == Some("German");
        let (german_name, aliases) = if is_german {
            (Some(tvmaze_show.name.clone()), german_akas)
        } else {
            let mut akas = german_akas.into_iter();
            (akas.next(), akas.collect())
        };

        let mut episodes: Vec<Episode> = embedded
            .episodes
            .into_iter()
            .filter_map(Self::convert_episode)
            .collect();
        episodes.sort_by_key(|e| e.key());

        ShowMetadata {
            id: show_id,
            name: tvmaze_show.name,
            german_name,
            aliases,
            episodes,
        }
    }

    /// Resolves a TVDB id to TVMaze's own show id.
    async fn lookup_tvmaze_id(&self, show_id: u32) -> Result<Option<u32>, MetadataRetrievalError> {
        let url = format!("{}/lookup/shows", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("thetvdb", show_id.to_string())])
            .send()
            .await
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if response.status() == 404 {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let show_ref: TvMazeShowRef = response
            .json()
            .await
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        Ok(Some(show_ref.id))
    }
}

#[async_trait]
impl MetadataProvider for TvMazeProvider {
    fn name(&self) -> &str {
        "tvmaze"
    }

    fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    async fn fetch_show(
        &self,
        show_id: u32,
    ) -> Result<Option<ShowMetadata>, MetadataRetrievalError> {
        let Some(tvmaze_id) = self.lookup_tvmaze_id(show_id).await? else {
            debug!(show_id, "show unknown to TVMaze");
            return Ok(None);
        };

        let url = format!("{}/shows/{}", self.base_url, tvmaze_id);

        let response = self
            .client
            .get(&url)
            .query(&[("embed[]", "episodes"), ("embed[]", "akas")])
            .send()
            .await
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let tvmaze_show: TvMazeShow = response
            .json()
            .await
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        if tvmaze_show.embedded.is_none() {
            return Err(MetadataRetrievalError::InvalidData(
                "No episodes found in API response".to_string(),
            ));
        }

        Ok(Some(Self::convert_to_show(show_id, tvmaze_show)))
    }
}
