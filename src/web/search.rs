//! Google Programmable Search (Custom Search JSON API) backend

use super::{SearchHit, SearchProvider};
use crate::{Error, Result};
use serde::Deserialize;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Search backend over the Custom Search JSON API
pub struct GoogleSearch {
    endpoint: String,
    api_key: String,
    engine_id: String,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn new(endpoint: &str, api_key: &str, engine_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        tracing::debug!(endpoint = %self.endpoint, query, "custom search request");

        let failed = |reason: String| Error::Search {
            query: query.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("hl", "en"),
            ])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("{} - {}", status, body)));
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid response: {}", e)))?;

        Ok(result
            .items
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    link: String,
}
