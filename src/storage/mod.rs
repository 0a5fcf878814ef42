//! Content-addressed cache of scraped reference documents
//!
//! Layout:
//! ```text
//! cache/
//!   <sha256(url)>.json   # {title, url, content, rate}
//! ```
//!
//! The cache is append/overwrite only and never evicts. A missing or
//! malformed entry reads as a miss.

use crate::reference::ReferenceDocument;
use crate::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute the cache key for a URL
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Summary of the cache directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Directory of one JSON file per cached URL
#[derive(Debug, Clone)]
pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    /// Open a cache rooted at `dir` (created lazily on first write)
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entry for `url`
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(url)))
    }

    /// Look up a previously scraped document
    pub fn get(&self, url: &str) -> Option<ReferenceDocument> {
        let path = self.path_for(url);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("Cache read failed for {:?}: {}", path, e);
                }
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::debug!("Ignoring malformed cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    /// Store a document, replacing any previous entry for its URL
    pub fn put(&self, document: &ReferenceDocument) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let path = self.path_for(&document.url);
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| Error::Encode(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| Error::io(&path, e))?;

        Ok(())
    }

    /// Count entries and bytes on disk
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.dir.exists() {
            return Ok(stats);
        }

        for entry in walkdir::WalkDir::new(&self.dir).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.dir).to_path_buf();
                Error::io(path, e.into())
            })?;

            let is_entry = entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("json");
            if is_entry {
                stats.entries += 1;
                stats.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(stats)
    }
}
