//! Feature records and language profiles
//!
//! A feature record is the unit of documentation. It is either a container
//! (declares `children`) or a leaf that the pipeline eventually fills with a
//! `description`, a `usage` outline of worked examples and `references`.

mod store;
mod tree;

pub use store::{FeatureStore, FsFeatureStore, MemoryFeatureStore};
pub use tree::{build_outline, survey, FeatureOutline, TreeSurvey};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Per-language configuration record (`<language>/index.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub id: String,
    pub title: String,
    /// Preferred documentation domains, searched with `site:`
    #[serde(default)]
    pub documents: Vec<String>,
    /// Substrings that exclude a search result by URL or title
    #[serde(default)]
    pub ignores: Vec<String>,
}

/// Provenance link kept in a feature record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// Skeleton entry produced by outline generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OutlineEntry>>,
}

/// A worked example, optionally nesting more specific examples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<UsageEntry>>,
}

impl UsageEntry {
    /// Example of this entry, or of its first descendant when it only groups
    pub fn first_example(&self) -> Option<&str> {
        match self.example.as_deref() {
            Some(example) if !example.trim().is_empty() => Some(example),
            _ => self
                .children
                .as_ref()
                .and_then(|children| children.first())
                .and_then(UsageEntry::first_example),
        }
    }
}

/// A feature record as persisted on disk
///
/// Field order here is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<OutlineEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Vec<UsageEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    /// Authored keys this crate does not interpret, written back last
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl FeatureRecord {
    /// Create a skeleton record
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Containers declare children and are never synthesized directly
    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    /// Whether outline generation already ran for this leaf
    pub fn has_outline(&self) -> bool {
        self.outline.as_ref().is_some_and(|outline| !outline.is_empty())
    }

    /// Whether usage generation already ran for this leaf
    ///
    /// Requires a description and an example on the first usage entry
    /// (or its first nested entry).
    pub fn has_complete_usage(&self) -> bool {
        let described = self
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());

        described
            && self
                .usage
                .as_ref()
                .and_then(|usage| usage.first())
                .and_then(UsageEntry::first_example)
                .is_some()
    }

    /// Curated references an author put on the record before generation
    pub fn seeded_references(&self) -> &[Link] {
        self.references.as_deref().unwrap_or_default()
    }

    /// Text used to search for references
    pub fn search_query(&self, language: &LanguageProfile) -> String {
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => query.to_string(),
            _ => format!("{} {}", language.title, self.title)
                .trim()
                .to_string(),
        }
    }

    /// Text the relevance scorer sees as the feature name
    pub fn subject(&self) -> &str {
        match self.query.as_deref() {
            Some(query) if !query.trim().is_empty() => query,
            _ => &self.title,
        }
    }
}

/// Decode a feature record from structured text
pub fn from_yaml(text: &str, origin: &Path) -> Result<FeatureRecord> {
    serde_yaml::from_str(text).map_err(|e| Error::Decode {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Encode a feature record with the stable key order
pub fn to_yaml(record: &FeatureRecord) -> Result<String> {
    serde_yaml::to_string(record).map_err(|e| Error::Encode(e.to_string()))
}

/// `<language>:<slash/separated/path>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureAddress {
    pub language: String,
    pub path: String,
}

impl FeatureAddress {
    pub fn new(language: &str, path: &str) -> Self {
        Self {
            language: language.to_string(),
            path: normalize_path(path),
        }
    }

    /// Address of a declared child
    ///
    /// The child must lie strictly below `self`: a segment that normalizes to
    /// nothing or climbs with `..` is rejected.
    pub fn child(&self, segment: &str) -> Result<Self> {
        let normalized = normalize_path(segment);
        if normalized.is_empty() || normalized.split('/').any(|s| s == "..") {
            return Err(Error::InvalidAddress(format!("{}/{}", self, segment)));
        }

        let path = if self.path.is_empty() {
            normalized
        } else {
            format!("{}/{}", self.path, normalized)
        };

        Ok(Self {
            language: self.language.clone(),
            path,
        })
    }

    /// Path segments below the language directory
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

impl FromStr for FeatureAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (language, path) = s.split_once(':').unwrap_or((s, ""));
        let language = language.trim();

        if language.is_empty() || language.contains('/') {
            return Err(Error::InvalidAddress(s.to_string()));
        }

        Ok(Self::new(language, path))
    }
}

impl fmt::Display for FeatureAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.path)
    }
}
