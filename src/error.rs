//! Error types for the generation pipeline
//!
//! Errors fall in two groups:
//! - Recoverable inside a stage (an empty page, an unparseable score) which
//!   never surface here; they become a skipped link or a zero score.
//! - Fatal for the current feature (navigation failure, synthesis parse
//!   failure, unresolved path), represented by [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error
#[derive(Debug, Error)]
pub enum Error {
    /// A feature path resolved to no file
    #[error("Feature {0} not found")]
    NotFound(String),

    /// A feature address was not of the form `<language>:<path>`
    #[error("Invalid feature address '{0}', expected <language>:<path>")]
    InvalidAddress(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A structured-text file could not be decoded
    #[error("Failed to parse {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// A record could not be serialized
    #[error("Failed to serialize feature record: {0}")]
    Encode(String),

    /// The search collaborator failed
    #[error("Search failed for '{query}': {reason}")]
    Search { query: String, reason: String },

    /// The page content did not materialize within the bounded wait
    #[error("Timed out scraping {url} after {secs}s")]
    ScrapeTimeout { url: String, secs: u64 },

    /// The scrape collaborator could not reach or render the page
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The LLM completion call failed
    #[error("LLM completion failed: {0}")]
    Completion(String),

    /// The LLM content response was not valid structured text
    #[error("Failed to parse synthesized content: {reason}")]
    SynthesisParse { reason: String, raw: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only aborts the current feature
    ///
    /// Everything except configuration problems is scoped to one node of the
    /// feature tree; the walker logs it and moves on to the next sibling.
    pub fn is_feature_scoped(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}
