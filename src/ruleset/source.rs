//! Curated rule set source
//!
//! Curated rule sets are maintained externally and fetched as a JSON array.

use super::Ruleset;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while fetching curated rule sets
#[derive(Debug, Error)]
pub enum RulesetSourceError {
    /// Request to the rule set source failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The response was not a JSON array
    #[error("Failed to parse rule sets: {0}")]
    ParseError(String),
}

/// Trait for sources of curated rule sets.
#[async_trait]
pub trait RulesetSource: Send + Sync {
    /// Fetches the complete current list of curated rule sets.
    async fn fetch(&self) -> Result<Vec<Ruleset>, RulesetSourceError>;
}

/// Fetches curated rule sets from an HTTP endpoint.
pub struct HttpRulesetSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRulesetSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RulesetSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RulesetSourceError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

/// Decodes a rule set array, skipping entries this version cannot read.
///
/// A single malformed entry must not discard every other curated rule set.
pub(crate) fn decode_rulesets(entries: Vec<serde_json::Value>) -> Vec<Ruleset> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Ruleset>(entry) {
            Ok(mut ruleset) => {
                if ruleset.id.is_empty() {
                    ruleset.id = format!("curated-{index}");
                }
                Some(ruleset)
            }
            Err(e) => {
                warn!(index, error = %e, "skipping unreadable curated rule set");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RulesetSource for HttpRulesetSource {
    async fn fetch(&self) -> Result<Vec<Ruleset>, RulesetSourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RulesetSourceError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RulesetSourceError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let entries: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| RulesetSourceError::ParseError(e.to_string()))?;

        let rulesets = decode_rulesets(entries);
        debug!(count = rulesets.len(), url = %self.url, "fetched curated rule sets");
        Ok(rulesets)
    }
}
