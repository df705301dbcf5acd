//! Rule sets
//!
//! A rule set is a declarative recipe binding a catalog topic to a known
//! show: which hits qualify (filters), how a candidate title is assembled
//! from a hit (title rules), and which matching strategy turns that hit
//! into an episode.

mod field;
mod filter;
pub mod generator;
mod pattern;
mod repository;
mod source;
mod store;
mod title;

pub use field::{HitField, extract_field};
pub use filter::{passes_all, passes_filter};
pub use generator::RulesetGenerator;
pub use pattern::{compile_pattern, last_capture};
pub use repository::{
    GeneratedRulesetRepository, InMemoryRulesetRepository, JsonRulesetRepository, PersistenceError,
};
pub use source::{HttpRulesetSource, RulesetSource, RulesetSourceError};
pub use store::{RulesetStore, RulesetStoreError};
pub use title::build_title;

use serde::{Deserialize, Serialize};

/// The algorithm a rule set uses to turn a hit into an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchingStrategy {
    /// Season and episode numbers are extracted with regexes
    SeasonAndEpisodeNumber,
    /// The episode name is contained in the candidate title
    ItemTitleIncludes,
    /// The episode name equals the candidate title
    ItemTitleExact,
    /// The candidate title is the episode's air date
    ItemTitleEqualsAirdate,
}

/// Comparison performed by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    ExactMatch,
    Contains,
    Regex,
    GreaterThan,
    LessThan,
    /// Operators this version does not know; never satisfied
    #[serde(other)]
    Unknown,
}

/// A pre-condition a hit must satisfy before matching is attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Name of the hit field to inspect (see [`HitField`])
    pub attribute: String,
    #[serde(rename = "type")]
    pub operator: FilterOperator,
    pub value: String,
}

/// One fragment of a candidate title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TitleRule {
    /// Literal text
    Static { value: String },
    /// The last capture group of `pattern` matched against `field`
    Regex { field: String, pattern: String },
}

/// The show a rule set resolves its hits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetShow {
    /// TVDB id of the show
    pub tvdb_id: u32,
    /// Human readable show name
    #[serde(default)]
    pub name: String,
}

/// A named recipe binding a catalog topic to a known show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    #[serde(default)]
    pub id: String,
    /// Exact catalog topic label
    pub topic: String,
    pub show: RulesetShow,
    /// Lower sorts first within a topic
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub title_rules: Vec<TitleRule>,
    #[serde(default)]
    pub season_regex: Option<String>,
    #[serde(default)]
    pub episode_regex: Option<String>,
    pub matching_strategy: MatchingStrategy,
    /// Fuzzy threshold for title strategies; engine default when absent
    #[serde(default)]
    pub title_threshold: Option<f64>,
}

impl Ruleset {
    pub fn show_id(&self) -> u32 {
        self.show.tvdb_id
    }

    /// Whether this rule set applies to hits published under `topic`
    pub fn covers_topic(&self, topic: &str) -> bool {
        topic_key(&self.topic) == topic_key(topic)
    }
}

/// Catalog topics are compared case-insensitively and ignoring outer whitespace
pub(crate) fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}
