//! Rule set store
//!
//! Merges curated and generated rule sets behind one read API. The merged
//! index is an immutable snapshot: refreshes build a complete new index and
//! then swap it in, so lookups never observe a half-built state. The very
//! first load is single-flight; concurrent first callers wait for the same
//! load.

use super::repository::{GeneratedRulesetRepository, PersistenceError};
use super::source::RulesetSource;
use super::{Ruleset, topic_key};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors that can occur while loading rule sets
#[derive(Debug, Error)]
pub enum RulesetStoreError {
    /// Generated rule sets could not be read
    #[error("Failed to load generated rule sets: {0}")]
    Persistence(#[from] PersistenceError),
}

/// One rule set source, indexed by topic and show.
#[derive(Debug, Default)]
struct SourceIndex {
    all: Vec<Ruleset>,
    by_topic: HashMap<String, Vec<Ruleset>>,
    by_show: HashMap<u32, Vec<Ruleset>>,
}

impl SourceIndex {
    fn build(mut rulesets: Vec<Ruleset>) -> Self {
        // Stable sort keeps source order among equal priorities
        rulesets.sort_by_key(|r| r.priority);

        let mut index = Self::default();
        for ruleset in &rulesets {
            index
                .by_topic
                .entry(topic_key(&ruleset.topic))
                .or_default()
                .push(ruleset.clone());
            index
                .by_show
                .entry(ruleset.show_id())
                .or_default()
                .push(ruleset.clone());
        }
        index.all = rulesets;
        index
    }

    fn topic(&self, topic: &str) -> &[Ruleset] {
        self.by_topic
            .get(&topic_key(topic))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn show(&self, show_id: u32) -> &[Ruleset] {
        self.by_show
            .get(&show_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Immutable view of all known rule sets.
#[derive(Debug, Default)]
struct RulesetIndex {
    curated: SourceIndex,
    generated: SourceIndex,
}

/// Read API over curated and generated rule sets.
pub struct RulesetStore {
    source: Option<Arc<dyn RulesetSource>>,
    repository: Arc<dyn GeneratedRulesetRepository>,
    snapshot: RwLock<Arc<RulesetIndex>>,
    initial_load: OnceCell<()>,
    /// Serializes index rebuilds
    rebuild_lock: Mutex<()>,
}

impl RulesetStore {
    /// Creates a store; nothing is loaded until the first lookup
    pub fn new(
        source: Option<Arc<dyn RulesetSource>>,
        repository: Arc<dyn GeneratedRulesetRepository>,
    ) -> Self {
        Self {
            source,
            repository,
            snapshot: RwLock::new(Arc::new(RulesetIndex::default())),
            initial_load: OnceCell::new(),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Current snapshot, waiting for the first load if it has not happened yet
    async fn snapshot(&self) -> Result<Arc<RulesetIndex>, RulesetStoreError> {
        self.initial_load
            .get_or_try_init(|| self.refresh())
            .await?;
        Ok(self.snapshot.read().clone())
    }

    fn publish(&self, index: RulesetIndex) {
        *self.snapshot.write() = Arc::new(index);
    }

    fn current_curated(&self) -> Vec<Ruleset> {
        self.snapshot.read().curated.all.clone()
    }

    /// Reloads curated and generated rule sets and publishes a new snapshot.
    ///
    /// If the curated source is unreachable, the previously loaded curated
    /// rule sets are kept.
    pub async fn refresh(&self) -> Result<(), RulesetStoreError> {
        let _guard = self.rebuild_lock.lock().await;

        let curated = match &self.source {
            None => Vec::new(),
            Some(source) => match source.fetch().await {
                Ok(rulesets) => rulesets,
                Err(e) => {
                    warn!(error = %e, "curated rule sets unavailable, keeping previous set");
                    self.current_curated()
                }
            },
        };
        let generated = self.repository.all()?;

        info!(
            curated = curated.len(),
            generated = generated.len(),
            "rule set index rebuilt"
        );

        self.publish(RulesetIndex {
            curated: SourceIndex::build(curated),
            generated: SourceIndex::build(generated),
        });
        Ok(())
    }

    /// Re-reads generated rule sets only, keeping the current curated ones.
    pub async fn reload_generated(&self) -> Result<(), RulesetStoreError> {
        self.snapshot().await?;
        let _guard = self.rebuild_lock.lock().await;

        let curated = self.current_curated();
        let generated = self.repository.all()?;
        debug!(generated = generated.len(), "generated rule sets reloaded");

        self.publish(RulesetIndex {
            curated: SourceIndex::build(curated),
            generated: SourceIndex::build(generated),
        });
        Ok(())
    }

    /// Spawns the periodic background refresh.
    ///
    /// Failures are logged; lookups keep using the last published snapshot.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if let Err(e) = store.refresh().await {
                    warn!(error = %e, "background rule set refresh failed");
                }
            }
        })
    }

    /// All rule sets for a catalog topic: generated first, then curated,
    /// each sorted ascending by priority.
    pub async fn for_topic(&self, topic: &str) -> Result<Vec<Ruleset>, RulesetStoreError> {
        let index = self.snapshot().await?;
        Ok(index
            .generated
            .topic(topic)
            .iter()
            .chain(index.curated.topic(topic))
            .cloned()
            .collect())
    }

    /// Rule sets for a topic that resolve to `show_id`, in `for_topic` order.
    pub async fn for_topic_and_show(
        &self,
        topic: &str,
        show_id: u32,
    ) -> Result<Vec<Ruleset>, RulesetStoreError> {
        let mut rulesets = self.for_topic(topic).await?;
        rulesets.retain(|r| r.show_id() == show_id);
        Ok(rulesets)
    }

    /// All rule sets of a show: curated first, then generated, each sorted
    /// ascending by priority.
    pub async fn for_show(&self, show_id: u32) -> Result<Vec<Ruleset>, RulesetStoreError> {
        let index = self.snapshot().await?;
        Ok(index
            .curated
            .show(show_id)
            .iter()
            .chain(index.generated.show(show_id))
            .cloned()
            .collect())
    }

    /// Whether any curated or generated rule set targets `show_id`
    pub async fn has_show(&self, show_id: u32) -> Result<bool, RulesetStoreError> {
        let index = self.snapshot().await?;
        Ok(!index.curated.show(show_id).is_empty() || !index.generated.show(show_id).is_empty())
    }

    /// Every known topic, sorted, in the spelling first seen
    pub async fn topics(&self) -> Result<Vec<String>, RulesetStoreError> {
        let index = self.snapshot().await?;
        let mut topics: BTreeMap<String, String> = BTreeMap::new();
        for ruleset in index.generated.all.iter().chain(&index.curated.all) {
            topics
                .entry(topic_key(&ruleset.topic))
                .or_insert_with(|| ruleset.topic.clone());
        }
        Ok(topics.into_values().collect())
    }
}
