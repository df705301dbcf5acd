/// TVMaze API response types for deserialization.
///
/// These structures mirror the JSON response format from the TVMaze API.
use serde::Deserialize;

/// Minimal show record returned by the lookup endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShowRef {
    /// TVMaze's own show id
    pub id: u32,
}

/// The show response with embedded resources.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShow {
    /// The name of the TV show
    pub name: String,
    /// Language of the show (e.g. "German", "English")
    pub language: Option<String>,
    /// Embedded resources (episodes, akas) when requested with ?embed[]=
    #[serde(rename = "_embedded")]
    pub embedded: Option<TvMazeEmbedded>,
}

/// Embedded resources in a TVMaze show response.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TvMazeEmbedded {
    /// List of episodes when embed[]=episodes is used
    #[serde(default)]
    pub episodes: Vec<TvMazeEpisode>,
    /// Alternative names when embed[]=akas is used
    #[serde(default)]
    pub akas: Vec<TvMazeAka>,
}

/// A single episode from the TVMaze API.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEpisode {
    /// Season number (0 for specials)
    pub season: u32,
    /// Episode number within the season (null for some specials)
    pub number: Option<u32>,
    /// Episode title (may be null for episodes without a title)
    pub name: Option<String>,
    /// Air date as YYYY-MM-DD (may be empty)
    pub airdate: Option<String>,
    /// Runtime in minutes
    pub runtime: Option<u32>,
    /// Episode summary in HTML format (may be null)
    pub summary: Option<String>,
}

/// An alternative show name.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeAka {
    pub name: String,
    pub country: Option<TvMazeCountry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TvMazeCountry {
    /// ISO 3166 country code
    pub code: String,
}
