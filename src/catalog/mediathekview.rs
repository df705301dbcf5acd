/// MediathekViewWeb catalog client implementation.
use super::mediathekview_types::{MvwEntry, MvwQuery, MvwQueryTerm, MvwResponse, loose_number};
use super::{CatalogClient, CatalogError, RawHit};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Fields the free-text query is matched against.
const QUERY_FIELDS: &[&str] = &["topic", "title"];

/// Catalog client for the MediathekViewWeb API.
///
/// Queries are sent to `{base_url}/api/query` and sorted by catalog
/// timestamp, newest first.
pub struct MediathekViewClient {
    client: reqwest::Client,
    base_url: String,
}

impl MediathekViewClient {
    /// Creates a new client for the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mediathek-matcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Converts a MediathekViewWeb entry to our internal RawHit structure.
    fn convert_entry(entry: MvwEntry) -> RawHit {
        RawHit {
            timestamp: loose_number(&entry.timestamp).unwrap_or_default(),
            duration: loose_number(&entry.duration)
                .and_then(|d| u64::try_from(d).ok())
                .unwrap_or_default(),
            size: loose_number(&entry.size)
                .and_then(|s| u64::try_from(s).ok())
                .unwrap_or_default(),
            channel: entry.channel,
            topic: entry.topic,
            title: entry.title,
            description: entry.description.unwrap_or_default(),
            url_video_low: entry.url_video_low.unwrap_or_default(),
            url_video: entry.url_video.unwrap_or_default(),
            url_video_hd: entry.url_video_hd.unwrap_or_default(),
        }
    }

    /// Performs the query, reporting every failure as an error.
    async fn query(&self, query: &str, max_results: usize) -> Result<Vec<RawHit>, CatalogError> {
        let url = format!("{}/api/query", self.base_url);

        let body = MvwQuery {
            queries: vec![MvwQueryTerm {
                fields: QUERY_FIELDS,
                query,
            }],
            sort_by: "timestamp",
            sort_order: "desc",
            future: false,
            offset: 0,
            size: max_results,
        };

        // The endpoint expects the JSON document as a text/plain body
        let payload =
            serde_json::to_string(&body).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(payload)
            .send()
            .await
            .map_err(|e| CatalogError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let parsed: MvwResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        if let Some(err) = parsed.err.filter(|e| !e.is_null()) {
            return Err(CatalogError::CatalogReported(err.to_string()));
        }

        let entries = parsed.result.map(|r| r.results).unwrap_or_default();
        Ok(entries.into_iter().map(Self::convert_entry).collect())
    }
}

#[async_trait]
impl CatalogClient for MediathekViewClient {
    async fn search(&self, query: &str, max_results: usize) -> Vec<RawHit> {
        match self.query(query, max_results).await {
            Ok(hits) => {
                debug!(query, count = hits.len(), "catalog search finished");
                hits
            }
            Err(e) => {
                warn!(query, error = %e, "catalog search failed, treating as empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_entry_tolerates_loose_numbers() {
        let entry: MvwEntry = serde_json::from_str(
            r#"{
                "channel": "ARD",
                "topic": "Tatort",
                "title": "Tatort: Der Fall (S01/E05)",
                "description": null,
                "timestamp": 1717791300,
                "duration": "5400",
                "size": null,
                "url_video": "https://example.invalid/sd.mp4",
                "url_video_hd": ""
            }"#,
        )
        .unwrap();

        let hit = MediathekViewClient::convert_entry(entry);
        assert_eq!(hit.topic, "Tatort");
        assert_eq!(hit.duration, 5400);
        assert_eq!(hit.size, 0);
        assert_eq!(hit.description, "");
        assert_eq!(hit.url_video_low, "");
        assert_eq!(hit.best_url(), "https://example.invalid/sd.mp4");
    }
}
