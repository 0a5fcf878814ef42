//! Content generation over the feature tree
//!
//! Two modes walk the same tree:
//! - [`GenerationMode::Outline`] gives each leaf a titles-only skeleton
//! - [`GenerationMode::Usage`] gives each leaf a description and worked usage
//!
//! Each mode only looks at the fields it writes when deciding to skip a leaf.

mod synthesizer;
mod walker;

pub use synthesizer::{build_request, parse_response, ContentSynthesizer, SynthesisResponse};
pub use walker::{FeatureTreeWalker, NodeOutcome, NodeReport, WalkReport};

use crate::feature::FeatureRecord;
use serde::Serialize;
use std::fmt;

/// Which fields a generation pass fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Outline,
    Usage,
}

impl GenerationMode {
    /// Whether the leaf already has what this mode produces
    pub fn is_complete(self, record: &FeatureRecord) -> bool {
        match self {
            GenerationMode::Outline => record.has_outline(),
            GenerationMode::Usage => record.has_complete_usage(),
        }
    }

    /// Modes selected by the `--outline`/`--usage` flags, in run order
    pub fn from_flags(outline: bool, usage: bool) -> Vec<GenerationMode> {
        match (outline, usage) {
            (true, true) => vec![GenerationMode::Outline, GenerationMode::Usage],
            (true, false) => vec![GenerationMode::Outline],
            _ => vec![GenerationMode::Usage],
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Outline => write!(f, "outline"),
            GenerationMode::Usage => write!(f, "usage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{OutlineEntry, UsageEntry};

    #[test]
    fn test_modes_from_flags() {
        assert_eq!(GenerationMode::from_flags(false, false), [GenerationMode::Usage]);
        assert_eq!(GenerationMode::from_flags(true, false), [GenerationMode::Outline]);
        assert_eq!(
            GenerationMode::from_flags(true, true),
            [GenerationMode::Outline, GenerationMode::Usage]
        );
    }

    #[test]
    fn test_each_mode_checks_its_own_fields() {
        let mut record = FeatureRecord::new("array", "Arrays");
        record.outline = Some(vec![OutlineEntry {
            title: "Create".to_string(),
            ..Default::default()
        }]);

        assert!(GenerationMode::Outline.is_complete(&record));
        assert!(!GenerationMode::Usage.is_complete(&record));

        record.outline = None;
        record.description = Some("Arrays hold values.".to_string());
        record.usage = Some(vec![UsageEntry {
            title: "Create".to_string(),
            example: Some("arrayOf(1)".to_string()),
            ..Default::default()
        }]);

        assert!(!GenerationMode::Outline.is_complete(&record));
        assert!(GenerationMode::Usage.is_complete(&record));
    }
}
