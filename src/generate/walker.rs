//! Depth-first generation over a feature tree

use super::{ContentSynthesizer, GenerationMode};
use crate::feature::{to_yaml, FeatureAddress, FeatureRecord, FeatureStore, LanguageProfile};
use crate::reference::{ReferenceCollector, ReferenceSet};
use crate::{Error, Result};
use serde::Serialize;
use similar::TextDiff;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stack entry: a node to visit, or a declared child that is not a valid address
type Pending = std::result::Result<(FeatureAddress, Option<(PathBuf, FeatureRecord)>), (String, Error)>;

/// Terminal state of one node in a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum NodeOutcome {
    /// Leaf already had the content this mode produces
    Skipped,
    /// Leaf content generated and saved
    Written,
    /// Leaf content generated, diff shown instead of saving
    Previewed { diff: String },
    /// Node could not be processed; its subtree was abandoned
    Failed { error: String },
}

/// Outcome of a single leaf or unresolved node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub feature: String,
    pub mode: GenerationMode,
    #[serde(flatten)]
    pub outcome: NodeOutcome,
}

/// Everything a pass did, in visiting order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WalkReport {
    pub nodes: Vec<NodeReport>,
}

impl WalkReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Written))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Failed { .. }))
    }

    pub fn previewed(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Previewed { .. }))
    }

    fn count(&self, predicate: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.nodes.iter().filter(|n| predicate(&n.outcome)).count()
    }

    fn push(&mut self, address: &FeatureAddress, mode: GenerationMode, outcome: NodeOutcome) {
        self.nodes.push(NodeReport {
            feature: address.to_string(),
            mode,
            outcome,
        });
    }
}

/// Walks declared children and generates content for leaves
///
/// Nodes are visited one at a time in declared order. Containers are never
/// written. A failing node is reported and the walk continues with its next
/// sibling.
pub struct FeatureTreeWalker {
    store: Arc<dyn FeatureStore>,
    collector: Option<ReferenceCollector>,
    synthesizer: ContentSynthesizer,
    dry_run: bool,
}

impl FeatureTreeWalker {
    pub fn new(store: Arc<dyn FeatureStore>, synthesizer: ContentSynthesizer) -> Self {
        Self {
            store,
            collector: None,
            synthesizer,
            dry_run: false,
        }
    }

    /// Collect references for every leaf before synthesis
    pub fn with_collector(mut self, collector: ReferenceCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Show diffs instead of saving
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run each mode in turn over the subtree at `address`
    pub async fn run(&self, address: &FeatureAddress, modes: &[GenerationMode]) -> Result<WalkReport> {
        let mut report = WalkReport::default();
        for &mode in modes {
            let pass = self.walk(address, mode).await?;
            report.nodes.extend(pass.nodes);
        }
        Ok(report)
    }

    /// One generation pass over the subtree at `address`
    ///
    /// Fails only when the language profile or the starting node cannot be
    /// loaded.
    pub async fn walk(&self, address: &FeatureAddress, mode: GenerationMode) -> Result<WalkReport> {
        let language = self.store.language(&address.language)?;
        let root = self.store.open(address)?;

        tracing::info!(feature = %address, %mode, "walking feature tree");

        let mut report = WalkReport::default();
        let mut stack: Vec<Pending> = vec![Ok((address.clone(), Some(root)))];

        while let Some(pending) = stack.pop() {
            let (current, opened) = match pending {
                Ok(pending) => pending,
                Err((feature, e)) => {
                    tracing::warn!(%feature, error = %e, "invalid child");
                    report.nodes.push(NodeReport {
                        feature,
                        mode,
                        outcome: NodeOutcome::Failed { error: e.to_string() },
                    });
                    continue;
                }
            };

            let opened = match opened {
                Some(opened) => Ok(opened),
                None => self.store.open(&current),
            };

            let (handle, record) = match opened {
                Ok(opened) => opened,
                Err(e) => {
                    tracing::warn!(feature = %current, error = %e, "skipping subtree");
                    report.push(&current, mode, NodeOutcome::Failed { error: e.to_string() });
                    continue;
                }
            };

            if let Some(children) = &record.children {
                tracing::debug!(feature = %current, count = children.len(), "container");
                for segment in children.iter().rev() {
                    stack.push(
                        current
                            .child(segment)
                            .map(|child| (child, None))
                            .map_err(|e| (format!("{}/{}", current, segment), e)),
                    );
                }
                continue;
            }

            let outcome = match self.process_leaf(&language, &handle, &record, mode).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_feature_scoped() => {
                    tracing::warn!(feature = %current, error = %e, "generation failed");
                    NodeOutcome::Failed { error: e.to_string() }
                }
                Err(e) => return Err(e),
            };

            if matches!(outcome, NodeOutcome::Written) {
                tracing::info!(feature = %current, %mode, "written");
            }
            report.push(&current, mode, outcome);
        }

        Ok(report)
    }

    async fn process_leaf(
        &self,
        language: &LanguageProfile,
        handle: &Path,
        record: &FeatureRecord,
        mode: GenerationMode,
    ) -> Result<NodeOutcome> {
        if mode.is_complete(record) {
            tracing::debug!(id = %record.id, %mode, "already generated");
            return Ok(NodeOutcome::Skipped);
        }

        let references = match &self.collector {
            Some(collector) => collector.collect(language, record).await?,
            None => ReferenceSet::default(),
        };

        let updated = self
            .synthesizer
            .synthesize(mode, language, record, &references)
            .await?;

        if self.dry_run {
            let before = self.store.read_raw(handle)?.unwrap_or_default();
            let after = to_yaml(&updated)?;
            let name = handle.display().to_string();
            let diff = TextDiff::from_lines(&before, &after)
                .unified_diff()
                .context_radius(3)
                .header(&name, &name)
                .to_string();
            return Ok(NodeOutcome::Previewed { diff });
        }

        self.store.save(handle, &updated)?;
        Ok(NodeOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::MemoryFeatureStore;
    use crate::llm::MockLlmClient;
    use crate::storage::ContentCache;
    use crate::web::mock::{MockScraper, MockSearch};
    use crate::web::SearchHit;
    use crate::Error;
    use tempfile::TempDir;

    const USAGE: &str = "description: Repeats code.\nusage:\n  - title: Basic\n    description: Count up.\n    example: for (i in 1..3) println(i)\n";
    const OUTLINE: &str = "title: Loop\noutline:\n  - title: Basic\n  - title: Ranges\n";

    fn store() -> Arc<MemoryFeatureStore> {
        let store = MemoryFeatureStore::default();
        store.insert("kotlin/index.yaml", "id: kotlin\ntitle: Kotlin\nchildren:\n  - loop\n");
        store.insert(
            "kotlin/loop/index.yaml",
            "id: loop\ntitle: 循环\nchildren:\n  - for\n  - while\n",
        );
        store.insert("kotlin/loop/for.yaml", "id: for\ntitle: for\n");
        store.insert("kotlin/loop/while.yaml", "id: while\ntitle: while\n");
        Arc::new(store)
    }

    fn synthesizer(client: &Arc<MockLlmClient>) -> ContentSynthesizer {
        ContentSynthesizer::new(client.clone())
    }

    fn loop_address() -> FeatureAddress {
        FeatureAddress::new("kotlin", "loop")
    }

    fn responding(key: &str, response: &str) -> Arc<MockLlmClient> {
        let mut client = MockLlmClient::new();
        client.add_response(key, response);
        Arc::new(client)
    }

    #[tokio::test]
    async fn test_container_recurses_in_declared_order() {
        let store = store();
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert_eq!(
            report.nodes.iter().map(|n| n.feature.as_str()).collect::<Vec<_>>(),
            ["kotlin:loop/for", "kotlin:loop/while"]
        );
        assert_eq!(report.written(), 2);

        let requests = client.requests();
        assert!(requests[0].user_query.contains("id: for"));
        assert!(requests[1].user_query.contains("id: while"));

        assert_eq!(
            store.get("kotlin/loop/index.yaml").unwrap(),
            "id: loop\ntitle: 循环\nchildren:\n  - for\n  - while\n"
        );
        assert!(store.get("kotlin/loop/for.yaml").unwrap().contains("Repeats code."));
    }

    #[tokio::test]
    async fn test_second_run_is_a_pure_skip() {
        let store = store();
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();
        let after_first = store.get("kotlin/loop/for.yaml").unwrap();
        let calls = client.calls();
        let saves = store.save_count();

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert_eq!(report.skipped(), 2);
        assert_eq!(client.calls(), calls);
        assert_eq!(store.save_count(), saves);
        assert_eq!(store.get("kotlin/loop/for.yaml").unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_containers_are_never_written_in_any_mode() {
        let store = store();
        let client = responding("Kotlin", OUTLINE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker
            .walk(&FeatureAddress::new("kotlin", ""), GenerationMode::Outline)
            .await
            .unwrap();

        assert_eq!(report.written(), 2);
        assert_eq!(
            store.get("kotlin/index.yaml").unwrap(),
            "id: kotlin\ntitle: Kotlin\nchildren:\n  - loop\n"
        );

        let record = store.load(Path::new("/features/kotlin/loop/while.yaml")).unwrap();
        assert!(record.has_outline());
        assert!(record.description.is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_record_untouched() {
        let store = store();
        let client = responding("Kotlin", "this is: not: valid: yaml: [");
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert_eq!(report.failed(), 2);
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.get("kotlin/loop/for.yaml").unwrap(), "id: for\ntitle: for\n");
    }

    #[tokio::test]
    async fn test_scrape_timeout_fails_only_that_leaf() {
        let temp = TempDir::new().unwrap();
        let store = store();

        let mut search = MockSearch::new();
        search.add_results("Kotlin for", vec![SearchHit::new("Slow", "https://slow.example")]);
        search.add_results("Kotlin while", vec![SearchHit::new("Fast", "https://fast.example")]);

        let mut scraper = MockScraper::new();
        scraper.add_timeout("https://slow.example");
        scraper.add_page("https://fast.example", "while loops");

        let mut client = MockLlmClient::new();
        client.add_response("rate how useful", r#"{"https://fast.example": 8}"#);
        client.add_response("Kotlin", USAGE);
        let client = Arc::new(client);

        let collector = ReferenceCollector::new(
            Arc::new(search),
            Arc::new(scraper),
            client.clone(),
            ContentCache::new(temp.path()),
        );
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client)).with_collector(collector);

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert!(matches!(report.nodes[0].outcome, NodeOutcome::Failed { .. }));
        assert_eq!(report.nodes[1].outcome, NodeOutcome::Written);
        assert_eq!(store.get("kotlin/loop/for.yaml").unwrap(), "id: for\ntitle: for\n");

        let written = store.get("kotlin/loop/while.yaml").unwrap();
        assert!(written.contains("https://fast.example"));
        assert!(!written.contains("while loops"));
    }

    #[tokio::test]
    async fn test_missing_child_is_reported_and_siblings_continue() {
        let store = store();
        store.insert(
            "kotlin/loop/index.yaml",
            "id: loop\ntitle: Loops\nchildren:\n  - ghost\n  - for\n",
        );
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert!(matches!(report.nodes[0].outcome, NodeOutcome::Failed { .. }));
        assert_eq!(report.nodes[1].outcome, NodeOutcome::Written);
    }

    #[tokio::test]
    async fn test_self_referencing_child_fails_and_walk_terminates() {
        let store = store();
        store.insert(
            "kotlin/loop/index.yaml",
            "id: loop\ntitle: Loops\nchildren:\n  - \".\"\n  - for\n",
        );
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker.walk(&loop_address(), GenerationMode::Usage).await.unwrap();

        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].feature, "kotlin:loop/.");
        assert!(matches!(report.nodes[0].outcome, NodeOutcome::Failed { .. }));
        assert_eq!(report.nodes[1].feature, "kotlin:loop/for");
        assert_eq!(report.nodes[1].outcome, NodeOutcome::Written);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store(), synthesizer(&client));

        let result = walker
            .walk(&FeatureAddress::new("kotlin", "nope"), GenerationMode::Usage)
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dry_run_previews_without_saving() {
        let store = store();
        let client = responding("Kotlin", USAGE);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client)).dry_run(true);

        let report = walker
            .walk(&FeatureAddress::new("kotlin", "loop/for"), GenerationMode::Usage)
            .await
            .unwrap();

        assert_eq!(report.previewed(), 1);
        assert_eq!(store.save_count(), 0);
        match &report.nodes[0].outcome {
            NodeOutcome::Previewed { diff } => assert!(diff.contains("+description: Repeats code.")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_outline_then_usage() {
        let store = store();
        let mut client = MockLlmClient::new();
        client.add_response("cheatsheet outline", OUTLINE);
        client.add_response("Kotlin", USAGE);
        let client = Arc::new(client);
        let walker = FeatureTreeWalker::new(store.clone(), synthesizer(&client));

        let report = walker
            .run(
                &FeatureAddress::new("kotlin", "loop/for"),
                &[GenerationMode::Outline, GenerationMode::Usage],
            )
            .await
            .unwrap();

        assert_eq!(report.written(), 2);
        let record = store.load(Path::new("/features/kotlin/loop/for.yaml")).unwrap();
        assert!(record.has_outline());
        assert!(record.has_complete_usage());
    }
}
