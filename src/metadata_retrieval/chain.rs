//! Provider chain
//!
//! Tries several metadata providers in order until one knows the show.

use super::{MetadataProvider, MetadataRetrievalError, ShowMetadata};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// An ordered list of metadata providers.
///
/// The first provider that returns metadata wins. A failing provider is
/// logged and skipped; the chain reports an error only if no provider
/// returned metadata and at least one of them failed.
#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn MetadataProvider>>,
}

impl ProviderChain {
    /// Creates an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider to the end of the chain
    pub fn with(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

#[async_trait]
impl MetadataProvider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    /// The shortest freshness window of all members
    fn cache_ttl(&self) -> Duration {
        self.providers
            .iter()
            .map(|p| p.cache_ttl())
            .min()
            .unwrap_or_default()
    }

    async fn fetch_show(
        &self,
        show_id: u32,
    ) -> Result<Option<ShowMetadata>, MetadataRetrievalError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.fetch_show(show_id).await {
                Ok(Some(show)) => return Ok(Some(show)),
                Ok(None) => continue,
                Err(e) => {
                    warn!(show_id, provider = provider.name(), error = %e, "metadata provider failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if self.providers.len() == 1 => Err(e),
            Some(e) => Err(MetadataRetrievalError::RequestError(format!(
                "all metadata providers failed, last error: {e}"
            ))),
            None => Ok(None),
        }
    }
}
