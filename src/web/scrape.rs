//! Firecrawl scrape backend
//!
//! Renders a page through the Firecrawl `/v1/scrape` API and returns the
//! main content as markdown text.

use super::PageScraper;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.firecrawl.dev";

/// Default bounded wait for a page to materialize (120 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Scraper backed by the Firecrawl HTTP API
pub struct FirecrawlScraper {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl FirecrawlScraper {
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.map(|s| s.to_string()),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Set the bounded wait for one page
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let navigation = |reason: String| Error::Navigation {
            url: url.to_string(),
            reason,
        };

        let request = ScrapeRequest {
            url: url.to_string(),
            formats: vec!["markdown".to_string()],
            only_main_content: true,
        };

        let mut req_builder = self
            .client
            .post(format!("{}/v1/scrape", self.endpoint))
            .json(&request);

        if let Some(ref key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| navigation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(navigation(format!("{} - {}", status, body)));
        }

        let result: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| navigation(format!("invalid response: {}", e)))?;

        if !result.success {
            return Err(navigation(
                result.error.unwrap_or_else(|| "scrape unsuccessful".to_string()),
            ));
        }

        Ok(result.data.and_then(|d| d.markdown).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl PageScraper for FirecrawlScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ScrapeTimeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest {
    url: String,
    formats: Vec<String>,
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
}
