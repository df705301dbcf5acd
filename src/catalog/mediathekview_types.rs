/// MediathekViewWeb API request and response types.
///
/// These structures mirror the JSON format of the `/api/query` endpoint.
use serde::{Deserialize, Serialize};

/// Request body for the query endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MvwQuery<'a> {
    pub queries: Vec<MvwQueryTerm<'a>>,
    pub sort_by: &'static str,
    pub sort_order: &'static str,
    pub future: bool,
    pub offset: usize,
    pub size: usize,
}

/// A single search term restricted to a set of fields.
#[derive(Debug, Serialize)]
pub(super) struct MvwQueryTerm<'a> {
    pub fields: &'static [&'static str],
    pub query: &'a str,
}

/// Top-level response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct MvwResponse {
    pub result: Option<MvwResult>,
    /// Non-null when the query was rejected
    pub err: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MvwResult {
    pub results: Vec<MvwEntry>,
}

/// One catalog entry. Numeric fields are occasionally null or empty strings.
#[derive(Debug, Deserialize)]
pub(super) struct MvwEntry {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub duration: Option<serde_json::Value>,
    #[serde(default)]
    pub size: Option<serde_json::Value>,
    #[serde(default)]
    pub url_video: Option<String>,
    #[serde(default)]
    pub url_video_low: Option<String>,
    #[serde(default)]
    pub url_video_hd: Option<String>,
}

/// Reads a JSON number that may also be encoded as a string.
pub(super) fn loose_number(value: &Option<serde_json::Value>) -> Option<i64> {
    match value.as_ref()? {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
