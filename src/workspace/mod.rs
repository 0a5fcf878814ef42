//! Documentation workspace
//!
//! A workspace is a directory holding:
//! - `.cheatdoc/config.toml` with collaborator settings
//! - the language/feature tree (`data_dir`)
//! - the scraped page cache (`cache_dir`)

mod config;

pub use config::{
    split_keys, LlmSection, ReferencesConfig, ScoringConfig, ScrapeConfig, SearchConfig,
    WorkspaceConfig, CONFIG_DIR,
};

use crate::feature::FsFeatureStore;
use crate::storage::ContentCache;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A workspace opened at a root directory
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Open the workspace at `path`, reading its configuration if present
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .with_context(|| format!("Failed to open workspace at {:?}", path))?;

        let config = WorkspaceConfig::load_or_default(&root)?;

        Ok(Self { root, config })
    }

    /// Get the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Get the path to the .cheatdoc directory
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(&self.config.data_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.config.cache_dir)
    }

    /// Feature store over the data directory
    pub fn feature_store(&self) -> FsFeatureStore {
        FsFeatureStore::new(self.data_dir(), &self.config.extension)
    }

    pub fn cache(&self) -> ContentCache {
        ContentCache::new(self.cache_dir())
    }

    /// Write the current configuration and create the cache directory
    pub fn init(&self) -> Result<()> {
        self.config.save(&self.root)?;

        let cache_dir = self.cache_dir();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create {:?}", cache_dir))?;

        Ok(())
    }
}

/// Read a required secret from the environment
pub fn env_secret(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("Environment variable {} is not set", name))?;

    if value.trim().is_empty() {
        anyhow::bail!("Environment variable {} is empty", name);
    }

    Ok(value)
}
