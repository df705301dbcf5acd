//! Generated rule set persistence
//!
//! Generated rule sets are created once per topic and reused afterwards.
//! The topic is unique: inserting a second rule set for a known topic is
//! rejected, which is the backstop against concurrent generation races.

use super::{Ruleset, topic_key};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting generated rule sets
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A generated rule set for this topic already exists
    #[error("A generated rule set for topic '{0}' already exists")]
    TopicExists(String),

    /// Failed to create the directory holding the rule set file
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read the rule set file
    #[error("Failed to read rule set file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the rule set file
    #[error("Failed to write rule set file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The rule set file is not valid JSON for our schema
    #[error("Failed to deserialize rule set file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize rule sets
    #[error("Failed to serialize rule sets: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Storage for generated rule sets, keyed by unique topic.
pub trait GeneratedRulesetRepository: Send + Sync {
    /// All stored rule sets
    fn all(&self) -> Result<Vec<Ruleset>, PersistenceError>;

    /// Stores a new rule set; fails with `TopicExists` if its topic is taken
    fn insert(&self, ruleset: Ruleset) -> Result<(), PersistenceError>;

    /// The rule set stored for `topic`, if any
    fn by_topic(&self, topic: &str) -> Result<Option<Ruleset>, PersistenceError> {
        let key = topic_key(topic);
        Ok(self
            .all()?
            .into_iter()
            .find(|ruleset| topic_key(&ruleset.topic) == key))
    }

    /// All rule sets stored for `show_id`
    fn by_show(&self, show_id: u32) -> Result<Vec<Ruleset>, PersistenceError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|ruleset| ruleset.show_id() == show_id)
            .collect())
    }
}

fn ensure_unique_topic(existing: &[Ruleset], ruleset: &Ruleset) -> Result<(), PersistenceError> {
    let key = topic_key(&ruleset.topic);
    if existing.iter().any(|r| topic_key(&r.topic) == key) {
        return Err(PersistenceError::TopicExists(ruleset.topic.clone()));
    }
    Ok(())
}

/// Volatile repository, used when nothing should touch the disk.
#[derive(Default)]
pub struct InMemoryRulesetRepository {
    rulesets: Mutex<Vec<Ruleset>>,
}

impl InMemoryRulesetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeneratedRulesetRepository for InMemoryRulesetRepository {
    fn all(&self) -> Result<Vec<Ruleset>, PersistenceError> {
        Ok(self.rulesets.lock().clone())
    }

    fn insert(&self, ruleset: Ruleset) -> Result<(), PersistenceError> {
        let mut rulesets = self.rulesets.lock();
        ensure_unique_topic(&rulesets, &ruleset)?;
        rulesets.push(ruleset);
        Ok(())
    }
}

/// Repository backed by a single JSON file.
///
/// The file is read once on open and rewritten on every insert, through a
/// temporary file so a crash never leaves a truncated document behind.
pub struct JsonRulesetRepository {
    path: PathBuf,
    rulesets: Mutex<Vec<Ruleset>>,
}

impl JsonRulesetRepository {
    /// Opens the repository at `path`, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let rulesets = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| PersistenceError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
            serde_json::from_str(&content).map_err(|e| PersistenceError::DeserializationFailed {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            rulesets: Mutex::new(rulesets),
        })
    }

    fn write(&self, rulesets: &[Ruleset]) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(rulesets)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, content).map_err(|e| PersistenceError::WriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| PersistenceError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl GeneratedRulesetRepository for JsonRulesetRepository {
    fn all(&self) -> Result<Vec<Ruleset>, PersistenceError> {
        Ok(self.rulesets.lock().clone())
    }

    fn insert(&self, ruleset: Ruleset) -> Result<(), PersistenceError> {
        let mut rulesets = self.rulesets.lock();
        ensure_unique_topic(&rulesets, &ruleset)?;

        rulesets.push(ruleset);
        if let Err(e) = self.write(&rulesets) {
            rulesets.pop();
            return Err(e);
        }
        Ok(())
    }
}
