//! Catalog access
//!
//! This module provides the representation of a single catalog search result
//! (`RawHit`) and the trait through which the matching engine queries the
//! external media catalog.
mod mediathekview;
mod mediathekview_types;

pub use mediathekview::MediathekViewClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the catalog.
///
/// These never reach callers of [`CatalogClient::search`]; they are logged
/// and turned into an empty result list by the client implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request to the catalog failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the catalog's JSON response
    #[error("Failed to parse catalog response: {0}")]
    ParseError(String),

    /// The catalog reported an error in its response body
    #[error("Catalog returned an error: {0}")]
    CatalogReported(String),
}

/// One catalog search result.
///
/// Produced by a [`CatalogClient`] and consumed read-only by every matching
/// stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Broadcasting channel (e.g. "ARD", "ZDF")
    pub channel: String,
    /// Show or segment label as published by the catalog
    pub topic: String,
    /// Episode-level label
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Unix timestamp at which the item was catalogued
    pub timestamp: i64,
    /// Duration in seconds
    pub duration: u64,
    /// Size in bytes
    pub size: u64,
    /// Low quality video URL
    pub url_video_low: String,
    /// Standard quality video URL
    pub url_video: String,
    /// High quality video URL
    pub url_video_hd: String,
}

impl RawHit {
    /// Calendar day (UTC) on which the item was catalogued
    pub fn catalog_date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.timestamp, 0).map(|dt| dt.date_naive())
    }

    /// Best available video URL, preferring higher quality
    pub fn best_url(&self) -> &str {
        [&self.url_video_hd, &self.url_video, &self.url_video_low]
            .into_iter()
            .find(|url| !url.is_empty())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Trait for clients that can search the external media catalog.
///
/// Searching is best-effort: implementations must return an empty list on
/// transport failures instead of propagating an error.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Sends a free-text query and returns at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Vec<RawHit>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_url_prefers_hd() {
        let mut hit = RawHit {
            url_video_low: "low".to_string(),
            url_video: "sd".to_string(),
            url_video_hd: "hd".to_string(),
            ..Default::default()
        };
        assert_eq!(hit.best_url(), "hd");

        hit.url_video_hd.clear();
        assert_eq!(hit.best_url(), "sd");

        hit.url_video.clear();
        hit.url_video_low.clear();
        assert_eq!(hit.best_url(), "");
    }

    #[test]
    fn test_catalog_date() {
        let hit = RawHit {
            // 2024-06-07T20:15:00Z
            timestamp: 1_717_791_300,
            ..Default::default()
        };
        assert_eq!(hit.catalog_date(), NaiveDate::from_ymd_opt(2024, 6, 7));
    }
}
