//! Reference gathering for a feature
//!
//! Turns a feature request into a ranked, deduplicated list of scraped
//! documents by combining search, scraping, the content cache and LLM
//! relevance scoring.

mod collector;
mod scoring;

pub use collector::ReferenceCollector;
pub use scoring::{parse_scores, rank, scoring_request};

use crate::feature::Link;
use serde::{Deserialize, Serialize};

/// Score of a document that has not been rated yet
pub const UNRATED: i32 = -1;

/// A scraped page, as cached and as handed to synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    #[serde(default)]
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default = "unrated")]
    pub rate: i32,
}

fn unrated() -> i32 {
    UNRATED
}

impl ReferenceDocument {
    pub fn new(title: &str, url: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            rate: UNRATED,
        }
    }

    /// Provenance link without the body
    pub fn link(&self) -> Link {
        Link {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Why a candidate link produced no document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already processed in this pass
    Duplicate,
    /// The page rendered without text
    EmptyContent,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Duplicate => write!(f, "duplicate"),
            SkipReason::EmptyContent => write!(f, "empty content"),
        }
    }
}

/// Result of processing one candidate link
///
/// Fatal failures (timeouts, navigation errors) are the `Err` side of the
/// surrounding `Result` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    Collected(ReferenceDocument),
    Skipped(SkipReason),
}

/// Documents gathered for one feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    pub documents: Vec<ReferenceDocument>,
    /// Links came from the record itself; order is authorial and unscored
    pub curated: bool,
}

impl ReferenceSet {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Title + URL of every document, content dropped
    pub fn links(&self) -> Vec<Link> {
        self.documents.iter().map(ReferenceDocument::link).collect()
    }
}

/// Tunables of a collection pass
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSettings {
    /// Hits kept per search query
    pub results_per_query: usize,
    /// URL substrings never collected, whatever the language
    pub excludes: Vec<String>,
    /// Minimum score kept after rating
    pub score_threshold: i32,
    /// Number of documents sent to the scorer
    pub score_prefix: usize,
    /// Rate searched references at all
    pub scoring_enabled: bool,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            results_per_query: 2,
            excludes: vec!["www.youtube.com".to_string(), "blog.csdn.net".to_string()],
            score_threshold: 6,
            score_prefix: 2,
            scoring_enabled: true,
        }
    }
}
