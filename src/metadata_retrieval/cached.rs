//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! automatically stores and retrieves show data from a local cache, using
//! the wrapped provider's own freshness window.

use super::{MetadataProvider, MetadataRetrievalError, ShowMetadata};
use crate::cache::CacheStorage;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A caching wrapper for metadata providers
///
/// This provider wraps another metadata provider and caches the results
/// to avoid redundant network requests. The cache is persistent across
/// application runs.
pub struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Cache storage for show data
    cache: CacheStorage<ShowMetadata>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let tvmaze = TvMazeProvider::new("https://api.tvmaze.com", ttl);
    /// let cache = CacheStorage::open("metadata_tvmaze", Some(tvmaze.cache_ttl()))?;
    /// let cached = CachedMetadataProvider::new(tvmaze, cache);
    /// ```
    pub(crate) fn new(provider: P, cache: CacheStorage<ShowMetadata>) -> Self {
        Self { provider, cache }
    }

    /// Generates a cache key for a show query
    fn cache_key(&self, show_id: u32) -> String {
        format!("{}_{}", self.provider.name(), show_id)
    }
}

#[async_trait]
impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn cache_ttl(&self) -> Duration {
        self.provider.cache_ttl()
    }

    async fn fetch_show(
        &self,
        show_id: u32,
    ) -> Result<Option<ShowMetadata>, MetadataRetrievalError> {
        let cache_key = self.cache_key(show_id);

        match self.cache.load(&cache_key) {
            Ok(Some(show)) => {
                debug!(show_id, provider = self.provider.name(), "metadata cache hit");
                return Ok(Some(show));
            }
            Ok(None) => {
                // Cache miss or stale entry - continue to fetch from provider
            }
            Err(e) => {
                // We don't want cache failures to prevent metadata retrieval
                debug!(show_id, error = %e, "metadata cache unreadable");
            }
        }

        let show = self.provider.fetch_show(show_id).await?;

        // Store in cache (ignore errors to avoid failing the request)
        if let Some(ref show) = show {
            let _ = self.cache.store(&cache_key, show);
        }

        Ok(show)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::test_support::{episode, show};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn cache_ttl(&self) -> Duration {
            Duration::from_secs(3600)
        }

        async fn fetch_show(
            &self,
            _show_id: u32,
        ) -> Result<Option<ShowMetadata>, MetadataRetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(show(vec![episode(1, 1, "Pilot", None)])))
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let cache = CacheStorage::open_in(dir.path(), "metadata", Some(provider.cache_ttl())).unwrap();
        let cached = CachedMetadataProvider::new(provider, cache);

        let first = cached.fetch_show(1234).await.unwrap();
        let second = cached.fetch_show(1234).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.provider.calls.load(Ordering::SeqCst), 1);
    }
}
