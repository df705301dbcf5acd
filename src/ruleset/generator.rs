//! Rule set generation
//!
//! When no rule set exists for a show, the generator searches the catalog,
//! picks the topic the show is published under and infers a matching
//! strategy from the shape of the sampled titles. Every inferred shape maps
//! to a fixed set of regex templates.

use super::repository::{GeneratedRulesetRepository, PersistenceError};
use super::{MatchingStrategy, Ruleset, RulesetShow, TitleRule, topic_key};
use crate::catalog::{CatalogClient, RawHit};
use crate::matching::GERMAN_MONTHS;
use crate::metadata_retrieval::ShowMetadata;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Signatures needed before a numbered or dated shape is trusted
const MIN_SIGNATURE_HITS: usize = 3;
/// Titles scanned for the concrete sub-pattern of the chosen shape
const TEMPLATE_SCAN_TITLES: usize = 5;

static BRACKET_SE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(S\d+/E\d+\)").expect("valid bracket regex"));
static COMPACT_SE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bS\d{1,4}E\d{1,4}\b").expect("valid SxxEyy regex"));
static STAFFEL_SE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Staffel\s*\d+.*?(?:Folge|Episode)\s*\d+").expect("valid Staffel regex")
});
static GERMAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b\d{{1,2}}\.\s*(?:{GERMAN_MONTHS})\s+\d{{4}}\b"))
        .expect("valid German date regex")
});
static DOTTED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{4}\b").expect("valid dotted date regex"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid ISO date regex"));
static COMPACT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(COMPACT_DATE_PATTERN).expect("valid compact date regex")
});
static ABSOLUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Folge|Episode|Teil)\s*\d+").expect("valid absolute regex"));

/// YYYYMMDD between non-digits, restricted to plausible years, months and days
const COMPACT_DATE_PATTERN: &str =
    r"(?:^|\D)((?:19|20)\d{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12]\d|3[01]))(?:\D|$)";

/// Strips a trailing parenthesized remark such as "(Audiodeskription)"
const TRAILING_REMARK: &str = r"(?:\s*\([^)]*\))?$";

/// How many sampled titles carry each signature.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignatureCounts {
    pub season_episode: usize,
    pub date: usize,
    pub absolute: usize,
    pub topic_prefix: usize,
    pub separator: usize,
    pub sampled: usize,
}

impl SignatureCounts {
    /// Counts signatures over `titles` published under `topic`
    pub fn of<'a>(titles: impl IntoIterator<Item = &'a str>, topic: &str) -> Self {
        let topic = topic.trim().to_lowercase();
        let mut counts = Self::default();

        for title in titles {
            counts.sampled += 1;
            if BRACKET_SE.is_match(title) || COMPACT_SE.is_match(title) || STAFFEL_SE.is_match(title)
            {
                counts.season_episode += 1;
            }
            if GERMAN_DATE.is_match(title)
                || DOTTED_DATE.is_match(title)
                || ISO_DATE.is_match(title)
                || COMPACT_DATE.is_match(title)
            {
                counts.date += 1;
            }
            if ABSOLUTE.is_match(title) {
                counts.absolute += 1;
            }
            if !topic.is_empty() && title.trim().to_lowercase().starts_with(&topic) {
                counts.topic_prefix += 1;
            }
            if title.contains(':') || title.contains(" - ") {
                counts.separator += 1;
            }
        }
        counts
    }
}

/// The title shape inferred from a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleShape {
    SeasonEpisode,
    Airdate,
    /// Running episode numbers without a season
    Absolute,
    /// "Topic: Episode name"
    PrefixedName,
    /// Anything else; the episode name is somewhere in the title
    FreeText,
}

impl TitleShape {
    /// Decides the shape from signature counts, in fixed priority order.
    pub fn decide(counts: &SignatureCounts) -> Self {
        if counts.season_episode >= MIN_SIGNATURE_HITS && counts.season_episode > counts.date {
            Self::SeasonEpisode
        } else if counts.date >= MIN_SIGNATURE_HITS && counts.date > counts.season_episode {
            Self::Airdate
        } else if counts.absolute >= MIN_SIGNATURE_HITS {
            Self::Absolute
        } else if counts.topic_prefix >= MIN_SIGNATURE_HITS
            && counts.separator * 10 >= counts.sampled * 3
        {
            Self::PrefixedName
        } else {
            Self::FreeText
        }
    }
}

/// Regexes and strategy for a new rule set
#[derive(Debug, Clone, PartialEq)]
struct Template {
    strategy: MatchingStrategy,
    title_rules: Vec<TitleRule>,
    season_regex: Option<String>,
    episode_regex: Option<String>,
}

impl Template {
    fn numbers(season: Option<&str>, episode: &str) -> Self {
        Self {
            strategy: MatchingStrategy::SeasonAndEpisodeNumber,
            title_rules: Vec::new(),
            season_regex: season.map(str::to_string),
            episode_regex: Some(episode.to_string()),
        }
    }

    fn titled(strategy: MatchingStrategy, pattern: &str) -> Self {
        Self {
            strategy,
            title_rules: vec![TitleRule::Regex {
                field: "title".to_string(),
                pattern: pattern.to_string(),
            }],
            season_regex: None,
            episode_regex: None,
        }
    }

    /// Picks the template for `shape` by looking at the first sampled titles.
    fn for_shape(shape: TitleShape, titles: &[&str]) -> Option<Self> {
        let scanned = || titles.iter().take(TEMPLATE_SCAN_TITLES).copied();

        match shape {
            TitleShape::SeasonEpisode => scanned().find_map(|title| {
                if BRACKET_SE.is_match(title) {
                    Some(Self::numbers(Some(r"\(S(\d+)/E\d+\)"), r"\(S\d+/E(\d+)\)"))
                } else if COMPACT_SE.is_match(title) {
                    Some(Self::numbers(Some(r"(?i)S(\d+)E\d+"), r"(?i)S\d+E(\d+)"))
                } else if STAFFEL_SE.is_match(title) {
                    let episode = if title.contains("Folge") {
                        r"Folge\s*(\d+)"
                    } else {
                        r"Episode\s*(\d+)"
                    };
                    Some(Self::numbers(Some(r"Staffel\s*(\d+)"), episode))
                } else {
                    None
                }
            }),
            TitleShape::Airdate => scanned().find_map(|title| {
                let pattern = if GERMAN_DATE.is_match(title) {
                    format!(r"(?i)(\d{{1,2}}\.\s*(?:{GERMAN_MONTHS})\s+\d{{4}})")
                } else if DOTTED_DATE.is_match(title) {
                    r"(?:^|\D)(\d{1,2}\.\d{1,2}\.\d{4})(?:\D|$)".to_string()
                } else if ISO_DATE.is_match(title) {
                    r"(?:^|\D)(\d{4}-\d{2}-\d{2})(?:\D|$)".to_string()
                } else if COMPACT_DATE.is_match(title) {
                    COMPACT_DATE_PATTERN.to_string()
                } else {
                    return None;
                };
                Some(Self::titled(MatchingStrategy::ItemTitleEqualsAirdate, &pattern))
            }),
            TitleShape::Absolute => scanned().find_map(|title| {
                let keyword = ABSOLUTE.captures(title)?.get(1)?.as_str();
                Some(Self::numbers(None, &format!(r"{keyword}\s*(\d+)")))
            }),
            TitleShape::PrefixedName => scanned().find_map(|title| {
                let pattern = if title.contains(':') {
                    format!(r":\s*(.+?){TRAILING_REMARK}")
                } else if title.contains(" - ") {
                    format!(r"\s-\s(.+?){TRAILING_REMARK}")
                } else {
                    return None;
                };
                Some(Self::titled(MatchingStrategy::ItemTitleExact, &pattern))
            }),
            TitleShape::FreeText => Some(Self::titled(MatchingStrategy::ItemTitleIncludes, "^(.+)$")),
        }
    }
}

/// Picks the catalog topic a show is published under.
///
/// An exact (case-insensitive) name match wins over a topic containing or
/// contained in a name; failing both, a result set with a single distinct
/// topic is taken as is.
pub fn pick_topic(hits: &[RawHit], names: &[&str]) -> Option<String> {
    let names: Vec<String> = names
        .iter()
        .map(|n| topic_key(n))
        .filter(|n| !n.is_empty())
        .collect();
    let topics: Vec<(&str, String)> = hits
        .iter()
        .map(|h| (h.topic.trim(), topic_key(&h.topic)))
        .filter(|(_, key)| !key.is_empty())
        .collect();

    let exact = names
        .iter()
        .find_map(|name| topics.iter().find(|(_, key)| key == name));
    let related = || {
        names.iter().find_map(|name| {
            topics
                .iter()
                .find(|(_, key)| key.contains(name.as_str()) || name.contains(key.as_str()))
        })
    };
    if let Some((topic, _)) = exact.or_else(related) {
        return Some(topic.to_string());
    }

    let (first, first_key) = topics.first()?;
    topics
        .iter()
        .all(|(_, key)| key == first_key)
        .then(|| first.to_string())
}

/// Creates and persists rule sets for shows that have none.
pub struct RulesetGenerator {
    catalog: Arc<dyn CatalogClient>,
    repository: Arc<dyn GeneratedRulesetRepository>,
    sample_size: usize,
    max_results: usize,
    /// One lock per show id; generation for a show never runs twice at once
    in_flight: parking_lot::Mutex<HashMap<u32, Arc<tokio::sync::Mutex<()>>>>,
}

impl RulesetGenerator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        repository: Arc<dyn GeneratedRulesetRepository>,
        sample_size: usize,
        max_results: usize,
    ) -> Self {
        Self {
            catalog,
            repository,
            sample_size,
            max_results,
            in_flight: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn show_lock(&self, show_id: u32) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.in_flight.lock().entry(show_id).or_default())
    }

    /// Drops the show's lock from the map unless another caller still holds it
    fn release_show_lock(&self, show_id: u32, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        // One reference in the map, one in `lock`
        if Arc::strong_count(&lock) <= 2 {
            in_flight.remove(&show_id);
        }
    }

    /// Generates a rule set for `show`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if no rule set could be inferred (no catalog results, no
    /// suitable topic, unrecognized titles), the persisted rule set
    /// otherwise. If a rule set for the chosen topic already exists, that
    /// one is returned unchanged. Only persistence faults are errors.
    pub async fn generate(&self, show: &ShowMetadata) -> Result<Option<Ruleset>, PersistenceError> {
        let lock = self.show_lock(show.id);
        let result = {
            let _guard = lock.lock().await;
            self.generate_locked(show).await
        };
        self.release_show_lock(show.id, lock);
        result
    }

    async fn generate_locked(
        &self,
        show: &ShowMetadata,
    ) -> Result<Option<Ruleset>, PersistenceError> {
        // A concurrent attempt may have finished while we were waiting
        if let Some(existing) = self.repository.by_show(show.id)?.into_iter().next() {
            debug!(show_id = show.id, ruleset = %existing.id, "rule set already generated");
            return Ok(Some(existing));
        }

        let hits = self.search(show).await;
        if hits.is_empty() {
            info!(show = show.display_name(), "cannot generate rule set: no catalog results");
            return Ok(None);
        }

        let Some(topic) = pick_topic(&hits, &show.names()) else {
            info!(show = show.display_name(), "cannot generate rule set: no matching topic");
            return Ok(None);
        };

        let titles: Vec<&str> = hits
            .iter()
            .filter(|h| topic_key(&h.topic) == topic_key(&topic))
            .take(self.sample_size)
            .map(|h| h.title.as_str())
            .collect();
        let counts = SignatureCounts::of(titles.iter().copied(), &topic);
        let shape = TitleShape::decide(&counts);
        debug!(topic = %topic, ?counts, ?shape, "inferred title shape");

        let Some(template) = Template::for_shape(shape, &titles) else {
            info!(topic = %topic, ?shape, "cannot generate rule set: no usable title pattern");
            return Ok(None);
        };

        let ruleset = Ruleset {
            id: Ulid::new().to_string(),
            topic,
            show: RulesetShow {
                tvdb_id: show.id,
                name: show.display_name().to_string(),
            },
            priority: 0,
            filters: Vec::new(),
            title_rules: template.title_rules,
            season_regex: template.season_regex,
            episode_regex: template.episode_regex,
            matching_strategy: template.strategy,
            title_threshold: None,
        };

        self.persist(ruleset).map(Some)
    }

    /// Localized name first; the original name only if that found nothing
    async fn search(&self, show: &ShowMetadata) -> Vec<RawHit> {
        let localized = show.display_name();
        let hits = self.catalog.search(localized, self.max_results).await;
        if !hits.is_empty() || localized.eq_ignore_ascii_case(&show.name) {
            return hits;
        }
        self.catalog.search(&show.name, self.max_results).await
    }

    /// Stores `ruleset` unless its topic is taken, returning the stored one
    fn persist(&self, ruleset: Ruleset) -> Result<Ruleset, PersistenceError> {
        if let Some(existing) = self.repository.by_topic(&ruleset.topic)? {
            return Ok(Self::keep_existing(existing, &ruleset));
        }

        match self.repository.insert(ruleset.clone()) {
            Ok(()) => {
                info!(
                    topic = %ruleset.topic,
                    show_id = ruleset.show_id(),
                    strategy = ?ruleset.matching_strategy,
                    "generated rule set"
                );
                Ok(ruleset)
            }
            Err(PersistenceError::TopicExists(topic)) => {
                // Lost a race on the topic; the winner's rule set is authoritative
                let existing = self
                    .repository
                    .by_topic(&topic)?
                    .ok_or(PersistenceError::TopicExists(topic))?;
                Ok(Self::keep_existing(existing, &ruleset))
            }
            Err(e) => Err(e),
        }
    }

    fn keep_existing(existing: Ruleset, requested: &Ruleset) -> Ruleset {
        if existing.show_id() != requested.show_id() {
            warn!(
                topic = %existing.topic,
                existing_show = existing.show_id(),
                requested_show = requested.show_id(),
                "topic already has a generated rule set for another show"
            );
        }
        existing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{DesiredEpisodes, match_hits};
    use crate::metadata_retrieval::test_support::{episode, show};
    use crate::ruleset::InMemoryRulesetRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Catalog answering fixed queries
    #[derive(Default)]
    struct FakeCatalog {
        responses: HashMap<String, Vec<RawHit>>,
        queries: parking_lot::Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with(mut self, query: &str, topic: &str, titles: &[&str]) -> Self {
            let hits = titles
                .iter()
                .map(|title| RawHit {
                    topic: topic.to_string(),
                    title: title.to_string(),
                    ..Default::default()
                })
                .collect();
            self.responses.insert(query.to_string(), hits);
            self
        }
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn search(&self, query: &str, _max_results: usize) -> Vec<RawHit> {
            self.queries.lock().push(query.to_string());
            self.responses.get(query).cloned().unwrap_or_default()
        }
    }

    fn generator_for(catalog: FakeCatalog) -> (RulesetGenerator, Arc<InMemoryRulesetRepository>) {
        let repository = Arc::new(InMemoryRulesetRepository::new());
        let generator = RulesetGenerator::new(
            Arc::new(catalog),
            repository.clone() as Arc<dyn GeneratedRulesetRepository>,
            15,
            100,
        );
        (generator, repository)
    }

    /// Repository where another show claims the topic right before the first insert
    struct ContestedRepository {
        inner: InMemoryRulesetRepository,
        rival: Ruleset,
        claimed: AtomicBool,
    }

    impl GeneratedRulesetRepository for ContestedRepository {
        fn all(&self) -> Result<Vec<Ruleset>, PersistenceError> {
            self.inner.all()
        }

        fn insert(&self, ruleset: Ruleset) -> Result<(), PersistenceError> {
            if !self.claimed.swap(true, Ordering::SeqCst) {
                self.inner.insert(self.rival.clone())?;
            }
            self.inner.insert(ruleset)
        }
    }

    /// Generates a rule set from `titles`, then matches one hit titled `fresh_title`
    async fn generate_and_match(
        titles: &[&str],
        episodes: Vec<crate::metadata_retrieval::Episode>,
        fresh_title: &str,
    ) -> (Ruleset, Option<(u32, u32)>) {
        let (generator, _) = generator_for(FakeCatalog::default().with("Tatort", "Tatort", titles));
        let s = show(episodes);
        let ruleset = generator.generate(&s).await.unwrap().unwrap();

        let fresh = RawHit {
            topic: "Tatort".to_string(),
            title: fresh_title.to_string(),
            ..Default::default()
        };
        let matched = match_hits(
            &DesiredEpisodes::Unrestricted,
            &s,
            &[fresh],
            std::slice::from_ref(&ruleset),
            1.0,
        );
        (ruleset, matched.first().map(|m| m.episode.key()))
    }

    fn topic_hit(topic: &str) -> RawHit {
        RawHit {
            topic: topic.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_staffel_titles_infer_season_and_episode() {
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &[
                "Staffel 1 Folge 1: Anfang",
                "Staffel 1 Folge 2: Mitte",
                "Staffel 1 Folge 3: Ende",
                "Trailer",
            ],
        );
        let (generator, _) = generator_for(catalog);

        let ruleset = generator.generate(&show(Vec::new())).await.unwrap().unwrap();
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::SeasonAndEpisodeNumber);
        assert_eq!(ruleset.season_regex.as_deref(), Some(r"Staffel\s*(\d+)"));
        assert_eq!(ruleset.episode_regex.as_deref(), Some(r"Folge\s*(\d+)"));
        assert_eq!(ruleset.topic, "Tatort");
        assert_eq!(ruleset.show_id(), 1234);
    }

    #[tokio::test]
    async fn test_generation_is_idempotent_per_topic() {
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &["Tatort (S01/E01)", "Tatort (S01/E02)", "Tatort (S01/E03)"],
        );
        let (generator, repository) = generator_for(catalog);
        let s = show(Vec::new());

        let first = generator.generate(&s).await.unwrap().unwrap();
        let second = generator.generate(&s).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(repository.all().unwrap().len(), 1);

        // Same topic requested for a different show: the stored rule set wins
        let mut other = s.clone();
        other.id = 99;
        let third = generator.generate(&other).await.unwrap().unwrap();
        assert_eq!(third, first);
        assert_eq!(repository.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_generation_creates_one_ruleset() {
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &["Tatort S01E01", "Tatort S01E02", "Tatort S01E03"],
        );
        let (generator, repository) = generator_for(catalog);
        let generator = Arc::new(generator);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move { generator.generate(&show(Vec::new())).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_some());
        }
        assert_eq!(repository.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_topic_taken_during_generation_returns_stored_rule_set() {
        let rival = Ruleset {
            id: "rival".to_string(),
            topic: "tatort".to_string(),
            show: RulesetShow {
                tvdb_id: 99,
                name: "Tatort Reloaded".to_string(),
            },
            priority: 0,
            filters: Vec::new(),
            title_rules: Vec::new(),
            season_regex: None,
            episode_regex: None,
            matching_strategy: MatchingStrategy::ItemTitleIncludes,
            title_threshold: None,
        };
        let repository = Arc::new(ContestedRepository {
            inner: InMemoryRulesetRepository::new(),
            rival: rival.clone(),
            claimed: AtomicBool::new(false),
        });
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &["Tatort (S01/E01)", "Tatort (S01/E02)", "Tatort (S01/E03)"],
        );
        let generator = RulesetGenerator::new(
            Arc::new(catalog),
            repository.clone() as Arc<dyn GeneratedRulesetRepository>,
            15,
            100,
        );

        let ruleset = generator.generate(&show(Vec::new())).await.unwrap().unwrap();
        assert_eq!(ruleset, rival);
        assert_eq!(repository.all().unwrap(), vec![rival]);
    }

    #[tokio::test]
    async fn test_show_locks_are_released() {
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &["Tatort S01E01", "Tatort S01E02", "Tatort S01E03"],
        );
        let (generator, _) = generator_for(catalog);
        let generator = Arc::new(generator);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move { generator.generate(&show(Vec::new())).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(generator.in_flight.lock().is_empty());

        let mut unknown = show(Vec::new());
        unknown.id = 7;
        unknown.german_name = Some("Unbekannt".to_string());
        assert!(generator.generate(&unknown).await.unwrap().is_none());
        assert!(generator.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn test_generated_rule_sets_match_fresh_hits() {
        let episodes = || {
            vec![
                episode(1, 1, "Anfang", Some("2024-06-07")),
                episode(1, 2, "Mitte", Some("2024-06-14")),
                episode(2, 1, "Neubeginn", Some("2024-06-21")),
            ]
        };

        let (ruleset, matched) = generate_and_match(
            &["Tatort S01E01", "Tatort S01E02", "Tatort S02E01"],
            episodes(),
            "Tatort S01E02 (Audiodeskription)",
        )
        .await;
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::SeasonAndEpisodeNumber);
        assert_eq!(matched, Some((1, 2)));

        let (ruleset, matched) = generate_and_match(
            &["Tatort Folge 1", "Tatort Folge 2", "Tatort Folge 3"],
            episodes(),
            "Tatort Folge 3",
        )
        .await;
        assert_eq!(ruleset.season_regex, None);
        assert_eq!(matched, Some((2, 1)));

        let (ruleset, matched) = generate_and_match(
            &[
                "Tatort vom 7. Juni 2024",
                "Tatort vom 14. Juni 2024",
                "Tatort vom 21. Juni 2024",
            ],
            episodes(),
            "Tatort vom 14. Juni 2024",
        )
        .await;
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::ItemTitleEqualsAirdate);
        assert_eq!(matched, Some((1, 2)));

        let (ruleset, matched) = generate_and_match(
            &["Tatort 20240607", "Tatort 20240614", "Tatort 20240621"],
            episodes(),
            "Tatort 20240621 (HD)",
        )
        .await;
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::ItemTitleEqualsAirdate);
        assert_eq!(matched, Some((2, 1)));

        let (_, matched) = generate_and_match(
            &["Tatort vom 07.06.2024", "Tatort vom 14.06.2024", "Tatort vom 21.06.2024"],
            episodes(),
            "Tatort vom 114.06.20245",
        )
        .await;
        assert_eq!(matched, None);
    }

    #[tokio::test]
    async fn test_falls_back_to_original_name() {
        let catalog = FakeCatalog::default().with(
            "Crime Scene",
            "Crime Scene",
            &[
                "Crime Scene vom 7. Juni 2024",
                "Crime Scene vom 14. Juni 2024",
                "Crime Scene vom 21. Juni 2024",
            ],
        );
        let (generator, _) = generator_for(catalog);

        let ruleset = generator.generate(&show(Vec::new())).await.unwrap().unwrap();
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::ItemTitleEqualsAirdate);
        assert_eq!(ruleset.topic, "Crime Scene");
    }

    #[tokio::test]
    async fn test_prefixed_titles_infer_exact_names() {
        let catalog = FakeCatalog::default().with(
            "Tatort",
            "Tatort",
            &[
                "Tatort: Der Fall",
                "Tatort: Die Falle (Audiodeskription)",
                "Tatort: Schöne Grüße",
                "Tatort",
            ],
        );
        let (generator, _) = generator_for(catalog);

        let ruleset = generator.generate(&show(Vec::new())).await.unwrap().unwrap();
        assert_eq!(ruleset.matching_strategy, MatchingStrategy::ItemTitleExact);

        let hit = RawHit {
            title: "Tatort: Die Falle (Audiodeskription)".to_string(),
            ..Default::default()
        };
        assert_eq!(
            crate::ruleset::build_title(&hit, &ruleset.title_rules).as_deref(),
            Some("Die Falle")
        );
    }

    #[tokio::test]
    async fn test_cannot_generate() {
        let (generator, repository) = generator_for(FakeCatalog::default());
        assert!(generator.generate(&show(Vec::new())).await.unwrap().is_none());
        assert!(repository.all().unwrap().is_empty());

        let mut catalog = FakeCatalog::default().with("Tatort", "Tagesschau", &["Ausgabe"]);
        catalog
            .responses
            .get_mut("Tatort")
            .unwrap()
            .push(topic_hit("Sportschau"));
        let (generator, repository) = generator_for(catalog);
        assert!(generator.generate(&show(Vec::new())).await.unwrap().is_none());
        assert!(repository.all().unwrap().is_empty());
    }

    #[test]
    fn test_pick_topic() {
        let names = ["Tatort", "Crime Scene"];

        let hits = vec![topic_hit("Tatort Klassiker"), topic_hit("TATORT")];
        assert_eq!(pick_topic(&hits, &names).as_deref(), Some("TATORT"));

        let hits = vec![topic_hit("Sportschau"), topic_hit("Tatort Klassiker")];
        assert_eq!(pick_topic(&hits, &names).as_deref(), Some("Tatort Klassiker"));

        let hits = vec![topic_hit("Krimi am Sonntag"), topic_hit("krimi am sonntag ")];
        assert_eq!(pick_topic(&hits, &names).as_deref(), Some("Krimi am Sonntag"));

        let hits = vec![topic_hit("Krimi am Sonntag"), topic_hit("Sportschau")];
        assert_eq!(pick_topic(&hits, &names), None);
        assert_eq!(pick_topic(&[], &names), None);
    }

    #[test]
    fn test_shape_thresholds() {
        let counts = |season_episode, date, absolute, topic_prefix, separator, sampled| {
            SignatureCounts {
                season_episode,
                date,
                absolute,
                topic_prefix,
                separator,
                sampled,
            }
        };

        assert_eq!(TitleShape::decide(&counts(3, 2, 0, 0, 0, 10)), TitleShape::SeasonEpisode);
        assert_eq!(TitleShape::decide(&counts(3, 3, 0, 0, 0, 10)), TitleShape::FreeText);
        assert_eq!(TitleShape::decide(&counts(3, 3, 3, 0, 0, 10)), TitleShape::Absolute);
        assert_eq!(TitleShape::decide(&counts(2, 3, 0, 0, 0, 10)), TitleShape::Airdate);
        assert_eq!(TitleShape::decide(&counts(2, 2, 0, 3, 3, 10)), TitleShape::PrefixedName);
        assert_eq!(TitleShape::decide(&counts(0, 0, 0, 3, 2, 10)), TitleShape::FreeText);
    }

    #[test]
    fn test_signature_counts() {
        let counts = SignatureCounts::of(
            [
                "Die Maus (S03/E12)",
                "Die Maus - Folge 4",
                "die maus vom 01.02.2024",
                "Sachgeschichte: Brot",
                "Die Maus 20240105",
                "Sendung 123456789",
            ],
            "Die Maus",
        );
        assert_eq!(
            counts,
            SignatureCounts {
                season_episode: 1,
                date: 2,
                absolute: 1,
                topic_prefix: 4,
                separator: 2,
                sampled: 6,
            }
        );
    }
}
