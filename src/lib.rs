//! MediathekMatcher - Find episodes and movies in the public broadcasters' media libraries
//!
//! This library maps the loosely labelled entries of the MediathekView
//! catalog onto the episodes of known shows. Per-show rule sets describe
//! which catalog entries belong to a show and how an entry's title reveals
//! the episode; shows without a rule set get one generated on first use.

mod cache;
pub mod catalog;
pub mod config;
mod engine;
pub mod matching;
pub mod metadata_retrieval;
pub mod ruleset;

pub use engine::{EngineSettings, MatchingEngine};

// Re-export the types most callers need
pub use catalog::{CatalogClient, RawHit};
pub use config::Config;
pub use matching::{
    DesiredEpisodes, MatchTightness, MatchedEpisodeInfo, MovieMatchResult, match_hits,
};
pub use metadata_retrieval::{Episode, MetadataProvider, MovieMetadata, ShowMetadata};
pub use ruleset::{MatchingStrategy, Ruleset};

// Re-export error types
pub use cache::CacheError;
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use ruleset::{PersistenceError, RulesetSourceError, RulesetStoreError};

use thiserror::Error;

/// Top-level error type for MediathekMatcher operations
#[derive(Debug, Error)]
pub enum MatcherError {
    /// Error while loading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while setting up the catalog client
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error while setting up the curated rule set source
    #[error("Rule set source error: {0}")]
    RulesetSource(#[from] RulesetSourceError),

    /// Error while loading rule sets
    #[error("Rule set store error: {0}")]
    RulesetStore(#[from] RulesetStoreError),

    /// Error while persisting generated rule sets
    #[error("Rule set persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// No metadata provider knows the show
    #[error("Unknown show: {0}")]
    UnknownShow(u32),
}
