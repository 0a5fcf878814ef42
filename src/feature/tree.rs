//! Read-only views over a feature tree

use super::{FeatureAddress, FeatureStore};
use crate::Result;
use serde::Serialize;

/// Navigation outline of a feature tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureOutline {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FeatureOutline>>,
}

/// Build the outline below `address`
///
/// Children that fail to resolve are left out with a warning; the root
/// itself must resolve.
pub fn build_outline(store: &dyn FeatureStore, address: &FeatureAddress) -> Result<FeatureOutline> {
    let (_, record) = store.open(address)?;

    let mut children = Vec::new();
    for segment in record.children.iter().flatten() {
        let child = match address.child(segment) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(feature = %address, "Skipping child: {}", e);
                continue;
            }
        };
        match build_outline(store, &child) {
            Ok(outline) => children.push(outline),
            Err(e) => tracing::warn!(feature = %child, "Skipping child: {}", e),
        }
    }

    Ok(FeatureOutline {
        id: record.id,
        title: record.title,
        children: if children.is_empty() { None } else { Some(children) },
    })
}

/// Generation progress over a subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeSurvey {
    pub containers: usize,
    pub leaves: usize,
    /// Leaves that already carry an outline
    pub outlined: usize,
    /// Leaves whose usage generation is complete
    pub completed: usize,
    /// Leaves that still need usage generation
    pub pending: Vec<String>,
    /// Declared children that do not resolve
    pub missing: Vec<String>,
}

/// Count containers and leaves and their generation state
pub fn survey(store: &dyn FeatureStore, address: &FeatureAddress) -> Result<TreeSurvey> {
    let mut report = TreeSurvey::default();
    let (_, root) = store.open(address)?;
    let mut stack = vec![(address.clone(), root)];

    while let Some((current, record)) = stack.pop() {
        if let Some(children) = &record.children {
            report.containers += 1;
            for segment in children.iter().rev() {
                let child = match current.child(segment) {
                    Ok(child) => child,
                    Err(_) => {
                        report.missing.push(format!("{}/{}", current, segment));
                        continue;
                    }
                };
                match store.open(&child) {
                    Ok((_, child_record)) => stack.push((child, child_record)),
                    Err(_) => report.missing.push(child.to_string()),
                }
            }
            continue;
        }

        report.leaves += 1;
        if record.has_outline() {
            report.outlined += 1;
        }
        if record.has_complete_usage() {
            report.completed += 1;
        } else {
            report.pending.push(current.to_string());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::MemoryFeatureStore;

    fn fixture() -> MemoryFeatureStore {
        let store = MemoryFeatureStore::default();
        store.insert(
            "kotlin/index.yaml",
            "id: kotlin\ntitle: Kotlin\nchildren:\n  - loop\n  - ghost\n",
        );
        store.insert(
            "kotlin/loop/index.yaml",
            "id: loop\ntitle: Loops\nchildren:\n  - for\n  - while\n",
        );
        store.insert(
            "kotlin/loop/for.yaml",
            "id: for\ntitle: for\ndescription: Iterate.\nusage:\n  - title: range\n    example: for (i in 1..3) {}\n",
        );
        store.insert(
            "kotlin/loop/while.yaml",
            "id: while\ntitle: while\noutline:\n  - title: basic\n",
        );
        store
    }

    #[test]
    fn test_outline_skips_missing_children() {
        let store = fixture();
        let outline = build_outline(&store, &FeatureAddress::new("kotlin", "")).unwrap();

        let children = outline.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "loop");

        let leaves = children[0].children.as_ref().unwrap();
        assert_eq!(leaves.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["for", "while"]);
        assert!(leaves[0].children.is_none());
    }

    #[test]
    fn test_survey_counts() {
        let store = fixture();
        let report = survey(&store, &FeatureAddress::new("kotlin", "")).unwrap();

        assert_eq!(report.containers, 2);
        assert_eq!(report.leaves, 2);
        assert_eq!(report.outlined, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(report.pending, vec!["kotlin:loop/while"]);
        assert_eq!(report.missing, vec!["kotlin:ghost"]);
    }

    fn looping() -> MemoryFeatureStore {
        let store = fixture();
        store.insert(
            "kotlin/loop/index.yaml",
            "id: loop\ntitle: Loops\nchildren:\n  - \".\"\n  - \"\"\n  - for\n",
        );
        store
    }

    #[test]
    fn test_outline_ignores_self_referencing_children() {
        let store = looping();
        let outline = build_outline(&store, &FeatureAddress::new("kotlin", "loop")).unwrap();

        let children = outline.children.unwrap();
        assert_eq!(children.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["for"]);
    }

    #[test]
    fn test_survey_reports_self_referencing_children_missing() {
        let store = looping();
        let report = survey(&store, &FeatureAddress::new("kotlin", "loop")).unwrap();

        assert_eq!(report.containers, 1);
        assert_eq!(report.leaves, 1);
        assert_eq!(report.missing, vec!["kotlin:loop/", "kotlin:loop/."]);
    }
}
