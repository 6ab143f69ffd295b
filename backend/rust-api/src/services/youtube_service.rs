use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::metrics::VIDEO_LOOKUPS_TOTAL;

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Client for the YouTube Data API search endpoint. Lookup failures never
/// surface to callers; the result is simply empty.
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    /// Search for videos matching the query and return watch URLs.
    /// Empty on HTTP error, bad payload, or missing credentials.
    pub async fn search(&self, query: &str, max_results: u32) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("YouTube API key not configured, skipping video lookup");
            VIDEO_LOOKUPS_TOTAL.with_label_values(&["skipped"]).inc();
            return Vec::new();
        };

        match self.search_inner(api_key, query, max_results).await {
            Ok(urls) => {
                VIDEO_LOOKUPS_TOTAL.with_label_values(&["success"]).inc();
                urls
            }
            Err(e) => {
                tracing::warn!("Video lookup failed for query '{}': {}", query, e);
                VIDEO_LOOKUPS_TOTAL.with_label_values(&["error"]).inc();
                Vec::new()
            }
        }
    }

    async fn search_inner(
        &self,
        api_key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<String>> {
        let max_results = max_results.to_string();

        let response = self
            .http
            .get(YOUTUBE_SEARCH_URL)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .context("Failed to call YouTube API")?;

        if !response.status().is_success() {
            return Err(anyhow!("YouTube API returned error {}", response.status()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse YouTube API response")?;

        Ok(body
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_returns_empty_without_network() {
        let client = YouTubeClient::new(None);
        let urls = client.search("rust ownership tutorial", 1).await;
        assert!(urls.is_empty());
    }

    #[test]
    fn search_response_maps_video_ids_to_watch_urls() {
        let raw = serde_json::json!({
            "items": [
                {"id": {"kind": "youtube#video", "videoId": "abc123"}},
                {"id": {"kind": "youtube#channel"}}
            ]
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let urls: Vec<String> = parsed
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            .collect();
        assert_eq!(urls, vec!["https://www.youtube.com/watch?v=abc123"]);
    }
}
