//! Matching engine
//!
//! Ties the collaborators together: metadata for the requested show, rule
//! sets (generated on demand), catalog searches per topic and the pure
//! matching pipeline.

use crate::MatcherError;
use crate::cache::CacheStorage;
use crate::catalog::{CatalogClient, MediathekViewClient, RawHit};
use crate::config::Config;
use crate::matching::{
    MatchedEpisodeInfo, MovieMatchResult, dedupe, desired_episodes, match_hits, match_movie, rank,
};
use crate::metadata_retrieval::{
    CachedMetadataProvider, MetadataProvider, MovieMetadata, ProviderChain, ShowMetadata,
    TvMazeProvider,
};
use crate::ruleset::{
    GeneratedRulesetRepository, HttpRulesetSource, JsonRulesetRepository, Ruleset,
    RulesetGenerator, RulesetSource, RulesetStore, topic_key,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables of a [`MatchingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Maximum hits requested per catalog query
    pub max_results: usize,
    /// Fuzzy threshold for rule sets without their own
    pub default_title_threshold: f64,
    /// Time budget of one lookup
    pub request_timeout: Duration,
    /// Catalog hits inspected when generating a rule set
    pub generator_sample_size: usize,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_results: config.catalog.max_results,
            default_title_threshold: config.matching.default_title_threshold,
            request_timeout: config.request_timeout(),
            generator_sample_size: config.matching.generator_sample_size,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Finds catalog entries for shows and movies.
pub struct MatchingEngine {
    catalog: Arc<dyn CatalogClient>,
    metadata: Arc<dyn MetadataProvider>,
    store: Arc<RulesetStore>,
    generator: RulesetGenerator,
    settings: EngineSettings,
}

impl MatchingEngine {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        metadata: Arc<dyn MetadataProvider>,
        source: Option<Arc<dyn RulesetSource>>,
        repository: Arc<dyn GeneratedRulesetRepository>,
        settings: EngineSettings,
    ) -> Self {
        let store = Arc::new(RulesetStore::new(source, Arc::clone(&repository)));
        let generator = RulesetGenerator::new(
            Arc::clone(&catalog),
            repository,
            settings.generator_sample_size,
            settings.max_results,
        );

        Self {
            catalog,
            metadata,
            store,
            generator,
            settings,
        }
    }

    /// Builds an engine talking to MediathekViewWeb and TVMaze
    pub fn from_config(config: &Config) -> Result<Self, MatcherError> {
        let http_timeout = Duration::from_secs(config.catalog.http_timeout_secs);

        let catalog = MediathekViewClient::new(&config.catalog.base_url, http_timeout)?;

        let tvmaze = TvMazeProvider::new(
            &config.metadata.tvmaze_base_url,
            Duration::from_secs(config.metadata.tvmaze_cache_ttl_secs),
        );
        let cache = CacheStorage::open("metadata_tvmaze", Some(tvmaze.cache_ttl()))?;
        let metadata = ProviderChain::new().with(CachedMetadataProvider::new(tvmaze, cache));

        let source = match &config.rulesets.curated_url {
            Some(url) => Some(
                Arc::new(HttpRulesetSource::new(url, http_timeout)?) as Arc<dyn RulesetSource>
            ),
            None => {
                info!("no curated rule set source configured, using generated rule sets only");
                None
            }
        };
        let repository = JsonRulesetRepository::open(&config.generated_rulesets_path()?)?;

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(metadata),
            source,
            Arc::new(repository),
            EngineSettings::from(config),
        ))
    }

    /// The rule set store, e.g. to start its background refresh
    pub fn rulesets(&self) -> &Arc<RulesetStore> {
        &self.store
    }

    /// Runs `lookup` within the request timeout; a timeout yields `fallback`
    async fn within_timeout<T>(
        &self,
        what: &str,
        lookup: impl Future<Output = T>,
        fallback: T,
    ) -> T {
        match tokio::time::timeout(self.settings.request_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    lookup = what,
                    timeout_secs = self.settings.request_timeout.as_secs_f64(),
                    "lookup timed out, returning no matches"
                );
                fallback
            }
        }
    }

    /// Finds catalog entries for episodes of a show.
    ///
    /// `season` and `episode` restrict the result as described in
    /// [`desired_episodes`](crate::matching::desired_episodes). Unknown
    /// shows, unreachable providers, shows without a rule set and timeouts
    /// all produce an empty list; only persistence faults are errors.
    pub async fn find_episodes(
        &self,
        show_id: u32,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<MatchedEpisodeInfo>, MatcherError> {
        self.within_timeout(
            "episodes",
            self.lookup_episodes(show_id, season, episode),
            Ok(Vec::new()),
        )
        .await
    }

    async fn lookup_episodes(
        &self,
        show_id: u32,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<MatchedEpisodeInfo>, MatcherError> {
        let Some(show) = self.show(show_id).await else {
            return Ok(Vec::new());
        };

        let desired = desired_episodes(&show, season, episode);
        if desired.is_empty() {
            debug!(show_id, ?season, ?episode, "requested episodes do not exist");
            return Ok(Vec::new());
        }

        if !self.ensure_rulesets(&show).await? {
            return Ok(Vec::new());
        }

        let mut topics: Vec<String> = Vec::new();
        for ruleset in self.store.for_show(show.id).await? {
            if !topics.iter().any(|t| topic_key(t) == topic_key(&ruleset.topic)) {
                topics.push(ruleset.topic);
            }
        }

        let mut matches = Vec::new();
        for topic in &topics {
            let rulesets = self.store.for_topic_and_show(topic, show.id).await?;
            let hits: Vec<RawHit> = self
                .catalog
                .search(topic, self.settings.max_results)
                .await
                .into_iter()
                .filter(|hit| topic_key(&hit.topic) == topic_key(topic))
                .collect();

            let found = match_hits(
                &desired,
                &show,
                &hits,
                &rulesets,
                self.settings.default_title_threshold,
            );
            debug!(topic = %topic, hits = hits.len(), matches = found.len(), "topic searched");
            matches.extend(found);
        }

        rank(&mut matches);
        let matches = dedupe(matches);
        info!(show = show.display_name(), matches = matches.len(), "episode lookup finished");
        Ok(matches)
    }

    /// Metadata for a show; provider failures count as an unknown show
    async fn show(&self, show_id: u32) -> Option<ShowMetadata> {
        match self.metadata.fetch_show(show_id).await {
            Ok(Some(show)) => Some(show),
            Ok(None) => {
                info!(show_id, "show unknown to metadata providers");
                None
            }
            Err(e) => {
                warn!(show_id, error = %e, "show metadata unavailable");
                None
            }
        }
    }

    /// Makes sure the show has a rule set, generating one if needed.
    ///
    /// Returns false if the show stays without a rule set.
    async fn ensure_rulesets(&self, show: &ShowMetadata) -> Result<bool, MatcherError> {
        if self.store.has_show(show.id).await? {
            return Ok(true);
        }

        info!(show = show.display_name(), "no rule set for show, generating one");
        if self.generator.generate(show).await?.is_none() {
            info!(show = show.display_name(), "show stays unmatched");
            return Ok(false);
        }

        self.store.reload_generated().await?;
        Ok(self.store.has_show(show.id).await?)
    }

    /// Generates a rule set for a show that has none.
    ///
    /// If the show already has a curated or generated rule set, the first of
    /// them (curated first) is returned and nothing is generated.
    pub async fn generate_for(&self, show_id: u32) -> Result<Option<Ruleset>, MatcherError> {
        let show = self
            .metadata
            .fetch_show(show_id)
            .await?
            .ok_or(MatcherError::UnknownShow(show_id))?;

        if let Some(existing) = self.store.for_show(show.id).await?.into_iter().next() {
            debug!(show_id, ruleset = %existing.id, "show already has a rule set");
            return Ok(Some(existing));
        }

        let ruleset = self.generator.generate(&show).await?;
        if ruleset.is_some() {
            self.store.reload_generated().await?;
        }
        Ok(ruleset)
    }

    /// Finds catalog entries for a movie, best candidates first.
    pub async fn find_movie(&self, movie: &MovieMetadata) -> Vec<MovieMatchResult> {
        self.within_timeout("movie", self.lookup_movie(movie), Vec::new())
            .await
    }

    async fn lookup_movie(&self, movie: &MovieMetadata) -> Vec<MovieMatchResult> {
        let mut queries: Vec<&str> = vec![movie.title.as_str()];
        if let Some(original) = movie
            .original_title
            .as_deref()
            .filter(|o| !o.eq_ignore_ascii_case(&movie.title))
        {
            queries.push(original);
        }

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for query in queries {
            for hit in self.catalog.search(query, self.settings.max_results).await {
                if hit.best_url().is_empty() || seen.insert(hit.best_url().to_string()) {
                    hits.push(hit);
                }
            }
        }

        let results = match_movie(movie, &hits);
        info!(movie = %movie.title, hits = hits.len(), matches = results.len(), "movie lookup finished");
        results
    }

    /// Every topic covered by a rule set
    pub async fn topics(&self) -> Result<Vec<String>, MatcherError> {
        Ok(self.store.topics().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::MetadataRetrievalError;
    use crate::metadata_retrieval::test_support::{episode, show};
    use crate::ruleset::InMemoryRulesetRepository;
    use async_trait::async_trait;

    struct SlowCatalog;

    #[async_trait]
    impl CatalogClient for SlowCatalog {
        async fn search(&self, _query: &str, _max_results: usize) -> Vec<RawHit> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Vec::new()
        }
    }

    struct StaticMetadata(Option<ShowMetadata>);

    #[async_trait]
    impl MetadataProvider for StaticMetadata {
        fn name(&self) -> &str {
            "static"
        }

        fn cache_ttl(&self) -> Duration {
            Duration::from_secs(60)
        }

        async fn fetch_show(
            &self,
            _show_id: u32,
        ) -> Result<Option<ShowMetadata>, MetadataRetrievalError> {
            Ok(self.0.clone())
        }
    }

    fn make_engine(metadata: Option<ShowMetadata>, request_timeout: Duration) -> MatchingEngine {
        MatchingEngine::new(
            Arc::new(SlowCatalog),
            Arc::new(StaticMetadata(metadata)),
            None,
            Arc::new(InMemoryRulesetRepository::new()),
            EngineSettings {
                request_timeout,
                ..EngineSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn test_timeout_yields_empty_result() {
        let engine = make_engine(
            Some(show(vec![episode(1, 1, "Der Fall", None)])),
            Duration::from_millis(50),
        );
        let matches = engine.find_episodes(1234, None, None).await.unwrap();
        assert!(matches.is_empty());

        let movie = MovieMetadata {
            title: "Das Boot".to_string(),
            original_title: None,
            aliases: Vec::new(),
            year: None,
            runtime: None,
        };
        assert!(engine.find_movie(&movie).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_show_and_impossible_request_skip_the_catalog() {
        // Querying the slow catalog would block for the full hour
        let timeout = Duration::from_secs(3600 * 2);

        let engine = make_engine(None, timeout);
        assert!(engine.find_episodes(1, Some("1"), None).await.unwrap().is_empty());
        assert!(matches!(
            engine.generate_for(1).await,
            Err(MatcherError::UnknownShow(1))
        ));

        let engine = make_engine(Some(show(vec![episode(1, 1, "Der Fall", None)])), timeout);
        assert!(engine.find_episodes(1234, Some("2020"), None).await.unwrap().is_empty());
    }
}
