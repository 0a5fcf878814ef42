//! Command implementations

use super::OutputFormat;
use crate::feature::{build_outline, survey, FeatureAddress, FeatureStore, TreeSurvey};
use crate::generate::{ContentSynthesizer, FeatureTreeWalker, GenerationMode, NodeOutcome, WalkReport};
use crate::llm::{ClientPool, LlmProvider};
use crate::reference::{ReferenceCollector, ReferenceSet};
use crate::web::{FirecrawlScraper, GoogleSearch};
use crate::workspace::{env_secret, split_keys, Workspace, WorkspaceConfig};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Initialize cheatdoc in a workspace
pub fn init(path: &Path, force: bool) -> Result<()> {
    let workspace = Workspace::open(path)?;

    if workspace.config_path().exists() && !force {
        anyhow::bail!("cheatdoc already initialized. Use --force to re-initialize.");
    }

    workspace.init()?;

    println!("✓ Initialized cheatdoc in {:?}", workspace.root());
    println!("  Config: {:?}", workspace.config_path());
    println!("  Features: {:?}", workspace.data_dir());
    println!("  Cache: {:?}", workspace.cache_dir());

    Ok(())
}

/// Generate content below a feature address
pub async fn feature(
    path: &Path,
    address: &str,
    modes: &[GenerationMode],
    dry_run: bool,
    format: OutputFormat,
) -> Result<WalkReport> {
    let workspace = Workspace::open(path)?;
    let address = parse_address(address)?;
    let config = workspace.config();

    let store: Arc<dyn FeatureStore> = Arc::new(workspace.feature_store());
    store.resolve(&address)?;

    let synthesizer = ContentSynthesizer::new(Arc::new(synthesis_pool(config)?));

    let mut walker = FeatureTreeWalker::new(store, synthesizer).dry_run(dry_run);
    if config.references.enabled {
        walker = walker.with_collector(build_collector(&workspace)?);
    }

    let report = walker
        .run(&address, modes)
        .await
        .with_context(|| format!("Failed to generate {}", address))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report_text(&report),
    }

    Ok(report)
}

/// Collect references for one feature without generating content
pub async fn references(path: &Path, address: &str, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(path)?;
    let address = parse_address(address)?;
    let store = workspace.feature_store();

    let language = store.language(&address.language)?;
    let (_, record) = store.open(&address)?;
    if record.is_container() {
        anyhow::bail!("{} is a container; pick one of its children", address);
    }

    let collector = build_collector(&workspace)?;
    let set = collector
        .collect(&language, &record)
        .await
        .with_context(|| format!("Failed to collect references for {}", address))?;

    match format {
        OutputFormat::Json => print_json(&set.documents)?,
        OutputFormat::Text => print_references_text(&set),
    }

    Ok(())
}

/// Print the feature tree below an address
pub fn tree(path: &Path, address: &str, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(path)?;
    let address = parse_address(address)?;
    let store = workspace.feature_store();

    let outline = build_outline(&store, &address)?;

    match format {
        OutputFormat::Json => print_json(&outline)?,
        OutputFormat::Text => {
            let yaml = serde_yaml::to_string(&outline).context("Failed to render outline")?;
            print!("{}", yaml);
        }
    }

    Ok(())
}

/// Show generation progress below an address
pub fn status(path: &Path, address: &str, format: OutputFormat) -> Result<TreeSurvey> {
    let workspace = Workspace::open(path)?;
    let address = parse_address(address)?;
    let store = workspace.feature_store();

    let report = survey(&store, &address)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("cheatdoc Status");
            println!("===============\n");
            println!("Feature: {}", address);
            println!("Containers: {}", report.containers);
            println!("Leaves: {}", report.leaves);
            println!("  With outline: {}", report.outlined);
            println!("  With usage: {}", report.completed);

            if !report.pending.is_empty() {
                println!("\nPending:");
                for feature in &report.pending {
                    println!("  - {}", feature);
                }
            }

            if !report.missing.is_empty() {
                println!("\nMissing:");
                for feature in &report.missing {
                    println!("  ✗ {}", feature);
                }
            }
        }
    }

    Ok(report)
}

/// Show cache statistics or a single cached page
pub fn cache(path: &Path, url: Option<&str>, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(path)?;
    let cache = workspace.cache();

    if let Some(url) = url {
        let document = cache
            .get(url)
            .with_context(|| format!("No cache entry for {}", url))?;

        match format {
            OutputFormat::Json => print_json(&document)?,
            OutputFormat::Text => {
                println!("Title: {}", document.title);
                println!("URL: {}", document.url);
                println!("File: {:?}", cache.path_for(url));
                println!("Length: {} chars\n", document.content.chars().count());
                println!("{}", document.content);
            }
        }
        return Ok(());
    }

    let stats = cache.stats()?;
    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => {
            println!("Cache: {:?}", cache.dir());
            println!("  Entries: {}", stats.entries);
            println!("  Size: {} bytes", stats.bytes);
        }
    }

    Ok(())
}

/// Show the effective configuration
pub fn config(path: &Path, format: OutputFormat) -> Result<()> {
    let workspace = Workspace::open(path)?;
    let config = workspace.config();

    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Text => {
            println!("# {:?}", workspace.config_path());
            let content = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            print!("{}", content);
        }
    }

    Ok(())
}

fn parse_address(address: &str) -> Result<FeatureAddress> {
    address
        .parse()
        .with_context(|| format!("Invalid feature address: {}", address))
}

/// One client per configured key for `model`
fn client_pool(config: &WorkspaceConfig, model: &str) -> Result<ClientPool> {
    let llm = &config.llm;
    let keys = match llm.provider {
        LlmProvider::Ollama => std::env::var(&llm.api_key_env)
            .map(|v| split_keys(&v))
            .unwrap_or_default(),
        _ => split_keys(&env_secret(&llm.api_key_env)?),
    };

    Ok(ClientPool::from_keys(&llm.client_config(model), &keys)?)
}

fn synthesis_pool(config: &WorkspaceConfig) -> Result<ClientPool> {
    client_pool(config, &config.llm.synthesis_model)
}

fn scoring_pool(config: &WorkspaceConfig) -> Result<ClientPool> {
    client_pool(config, &config.llm.scoring_model)
}

/// Wire search, scrape, scoring and cache from the configuration
fn build_collector(workspace: &Workspace) -> Result<ReferenceCollector> {
    let config = workspace.config();

    if config.search.engine_id.trim().is_empty() {
        anyhow::bail!(
            "search.engine_id is not set in {:?}",
            workspace.config_path()
        );
    }
    let search_key = env_secret(&config.search.api_key_env)?;
    let search = GoogleSearch::new(&config.search.endpoint, &search_key, &config.search.engine_id);

    let scrape_key = std::env::var(&config.scrape.api_key_env).ok();
    let scraper = FirecrawlScraper::new(&config.scrape.endpoint, scrape_key.as_deref())
        .with_timeout(Duration::from_secs(config.scrape.timeout_secs));

    let collector = ReferenceCollector::new(
        Arc::new(search),
        Arc::new(scraper),
        Arc::new(scoring_pool(config)?),
        workspace.cache(),
    )
    .with_settings(config.collector_settings());

    Ok(collector)
}

/// Print any serializable value as JSON
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a walk report in human-readable format
pub fn print_report_text(report: &WalkReport) {
    if report.nodes.is_empty() {
        println!("No leaf features found.");
        return;
    }

    for node in &report.nodes {
        match &node.outcome {
            NodeOutcome::Written => println!("✓ [{}] {}", node.mode, node.feature),
            NodeOutcome::Skipped => println!("- [{}] {} (already generated)", node.mode, node.feature),
            NodeOutcome::Failed { error } => println!("✗ [{}] {}: {}", node.mode, node.feature, error),
            NodeOutcome::Previewed { diff } => {
                println!("~ [{}] {}", node.mode, node.feature);
                print!("{}", diff);
            }
        }
    }

    println!(
        "\nWritten: {}  Skipped: {}  Failed: {}  Previewed: {}",
        report.written(),
        report.skipped(),
        report.failed(),
        report.previewed()
    );
}

/// Print collected references in human-readable format
pub fn print_references_text(set: &ReferenceSet) {
    if set.is_empty() {
        println!("No references kept.");
        return;
    }

    let origin = if set.curated { "authored" } else { "ranked" };
    println!("References ({}):\n", origin);

    for (i, document) in set.documents.iter().enumerate() {
        if set.curated {
            println!("{}. {}", i + 1, document.title);
        } else {
            println!("{}. [{}] {}", i + 1, document.rate, document.title);
        }
        println!("   {}", document.url);
    }
}
