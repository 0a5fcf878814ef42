//! Search and scrape collaborators
//!
//! The pipeline only sees two capabilities:
//! - [`SearchProvider`]: a query in, the top few `{title, url}` hits out
//! - [`PageScraper`]: a URL in, the page's extracted text out
//!
//! Both are rate sensitive and are always called one request at a time.

mod scrape;
mod search;

pub use scrape::{FirecrawlScraper, DEFAULT_ENDPOINT as SCRAPE_ENDPOINT};
pub use search::{GoogleSearch, DEFAULT_ENDPOINT as SEARCH_ENDPOINT};

use crate::Result;
use serde::{Deserialize, Serialize};

/// A search result link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

/// Trait for web search backends
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query and return hits in rank order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Trait for page text extraction backends
#[async_trait::async_trait]
pub trait PageScraper: Send + Sync {
    /// Fetch a page and return its text
    ///
    /// Timeouts and navigation failures are errors; a page that renders
    /// without text is `Ok` with an empty string.
    async fn scrape(&self, url: &str) -> Result<String>;
}

/// Drop excluded hits and keep the first `limit`
///
/// A hit is excluded when its URL contains a built-in exclude, or its URL
/// or title contains one of the language's ignore patterns.
pub fn filter_hits(
    hits: Vec<SearchHit>,
    excludes: &[String],
    ignores: &[String],
    limit: usize,
) -> Vec<SearchHit> {
    hits.into_iter()
        .filter(|hit| {
            !excludes
                .iter()
                .filter(|e| !e.is_empty())
                .any(|e| hit.url.contains(e.as_str()))
        })
        .filter(|hit| {
            !ignores
                .iter()
                .filter(|i| !i.is_empty())
                .any(|i| hit.url.contains(i.as_str()) || hit.title.contains(i.as_str()))
        })
        .take(limit)
        .collect()
}

/// Scripted collaborators for tests and offline runs
pub mod mock {
    use super::{PageScraper, SearchHit, SearchProvider};
    use crate::{Error, Result};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Search backend answering from a fixed table
    #[derive(Default)]
    pub struct MockSearch {
        results: HashMap<String, Vec<SearchHit>>,
        queries: Mutex<Vec<String>>,
    }

    impl MockSearch {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register hits for an exact query
        pub fn add_results(&mut self, query: &str, hits: Vec<SearchHit>) {
            self.results.insert(query.to_string(), hits);
        }

        /// Queries received so far
        pub fn queries(&self) -> Vec<String> {
            self.queries
                .lock()
                .map(|q| q.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(query.to_string());
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    /// Scraper answering from a fixed table of pages
    #[derive(Default)]
    pub struct MockScraper {
        pages: HashMap<String, String>,
        timeouts: Vec<String>,
        calls: AtomicUsize,
    }

    impl MockScraper {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_page(&mut self, url: &str, text: &str) {
            self.pages.insert(url.to_string(), text.to_string());
        }

        /// Make scraping `url` fail with a timeout
        pub fn add_timeout(&mut self, url: &str) {
            self.timeouts.push(url.to_string());
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageScraper for MockScraper {
        async fn scrape(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.timeouts.iter().any(|t| t == url) {
                return Err(Error::ScrapeTimeout {
                    url: url.to_string(),
                    secs: 120,
                });
            }
            Ok(self.pages.get(url).cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit::new("Video", "https://www.youtube.com/watch?v=1"),
            SearchHit::new("Kotlin docs", "https://kotlinlang.org/docs/arrays.html"),
            SearchHit::new("Medium post", "https://medium.com/kotlin-arrays"),
            SearchHit::new("Baeldung", "https://www.baeldung.com/kotlin/arrays"),
            SearchHit::new("Another", "https://example.com/arrays"),
        ]
    }

    #[test]
    fn test_filter_hits() {
        let excludes = vec!["www.youtube.com".to_string()];
        let ignores = vec!["medium.com".to_string()];

        let kept = filter_hits(hits(), &excludes, &ignores, 2);

        assert_eq!(
            kept.iter().map(|h| h.url.as_str()).collect::<Vec<_>>(),
            [
                "https://kotlinlang.org/docs/arrays.html",
                "https://www.baeldung.com/kotlin/arrays"
            ]
        );
    }

    #[test]
    fn test_empty_patterns_exclude_nothing() {
        let blank = vec![String::new()];
        let kept = filter_hits(hits(), &blank, &blank, 10);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn test_ignore_matches_title() {
        let ignores = vec!["Baeldung".to_string()];
        let kept = filter_hits(hits(), &[], &ignores, 10);
        assert!(kept.iter().all(|h| h.title != "Baeldung"));
        assert_eq!(kept.len(), 4);
    }
}
