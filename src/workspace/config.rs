//! Workspace configuration (`.cheatdoc/config.toml`)

use crate::llm::{LlmConfig, LlmProvider};
use crate::reference::CollectorSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the per-workspace settings directory
pub const CONFIG_DIR: &str = ".cheatdoc";

/// Configuration for a documentation workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root of the language/feature tree, relative to the workspace
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory of cached scraped pages, relative to the workspace
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Extension of feature files
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub references: ReferencesConfig,

    #[serde(default)]
    pub llm: LlmSection,
}

/// Search backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Custom Search engine id (`cx`)
    #[serde(default)]
    pub engine_id: String,

    /// Environment variable holding the API key
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Hits kept per query
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// URL substrings never collected
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,
}

/// Scraping backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_scrape_key_env")]
    pub api_key_env: String,

    /// Bounded wait for one page
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Relevance scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum score a reference needs to be kept (0-10)
    #[serde(default = "default_threshold")]
    pub threshold: i32,

    /// Number of leading candidates sent for rating
    #[serde(default = "default_prefix")]
    pub prefix: usize,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Reference collection toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// LLM endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub provider: LlmProvider,

    /// API endpoint URL, provider default when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model for content synthesis
    #[serde(default = "default_synthesis_model")]
    pub synthesis_model: String,

    /// Model for relevance scoring
    #[serde(default = "default_scoring_model")]
    pub scoring_model: String,

    /// Environment variable holding one or more comma separated keys
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_data_dir() -> String {
    "src/language".to_string()
}

fn default_cache_dir() -> String {
    "cache".to_string()
}

fn default_extension() -> String {
    "yaml".to_string()
}

fn default_search_endpoint() -> String {
    crate::web::SEARCH_ENDPOINT.to_string()
}

fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_results_per_query() -> usize {
    CollectorSettings::default().results_per_query
}

fn default_excludes() -> Vec<String> {
    CollectorSettings::default().excludes
}

fn default_scrape_endpoint() -> String {
    crate::web::SCRAPE_ENDPOINT.to_string()
}

fn default_scrape_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_threshold() -> i32 {
    6
}

fn default_prefix() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_synthesis_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_scoring_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_llm_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_tokens() -> usize {
    32768
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_retries() -> usize {
    3
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            extension: default_extension(),
            search: SearchConfig::default(),
            scrape: ScrapeConfig::default(),
            scoring: ScoringConfig::default(),
            references: ReferencesConfig::default(),
            llm: LlmSection::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            engine_id: String::new(),
            api_key_env: default_search_key_env(),
            results_per_query: default_results_per_query(),
            excludes: default_excludes(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scrape_endpoint(),
            api_key_env: default_scrape_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            prefix: default_prefix(),
            enabled: true,
        }
    }
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: None,
            synthesis_model: default_synthesis_model(),
            scoring_model: default_scoring_model(),
            api_key_env: default_llm_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

impl WorkspaceConfig {
    /// Load configuration from the workspace or return defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: WorkspaceConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the workspace
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {:?}", config_dir))?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Collection tunables derived from the search and scoring sections
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            results_per_query: self.search.results_per_query,
            excludes: self.search.excludes.clone(),
            score_threshold: self.scoring.threshold.clamp(0, 10),
            score_prefix: self.scoring.prefix,
            scoring_enabled: self.scoring.enabled,
        }
    }
}

impl LlmSection {
    /// Client settings for `model`, without an API key
    pub fn client_config(&self, model: &str) -> LlmConfig {
        let defaults = LlmConfig::for_provider(self.provider);
        LlmConfig {
            provider: self.provider,
            endpoint: self.endpoint.clone().unwrap_or(defaults.endpoint),
            model: model.to_string(),
            api_key: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_retries: self.max_retries,
        }
    }
}

/// Split a comma separated key list, dropping blanks
pub fn split_keys(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.data_dir, "src/language");
        assert_eq!(config.scoring.threshold, 6);
        assert_eq!(config.search.results_per_query, 2);
        assert!(config.references.enabled);
        assert!(config.search.excludes.contains(&"www.youtube.com".to_string()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: WorkspaceConfig = toml::from_str(
            "data_dir = \"docs\"\n\n[scoring]\nthreshold = 8\n\n[llm]\nprovider = \"ollama\"\n",
        )
        .unwrap();

        assert_eq!(config.data_dir, "docs");
        assert_eq!(config.cache_dir, "cache");
        assert_eq!(config.scoring.threshold, 8);
        assert_eq!(config.scoring.prefix, 2);
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.scrape.timeout_secs, 120);
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let mut config = WorkspaceConfig::default();
        config.search.engine_id = "abc123".to_string();
        config.save(temp.path()).unwrap();

        let loaded = WorkspaceConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_client_config_uses_provider_endpoint() {
        let mut section = LlmSection::default();
        section.provider = LlmProvider::Ollama;

        let config = section.client_config("llama3");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.endpoint, "http://localhost:11434");

        section.endpoint = Some("http://gpu-box:11434".to_string());
        assert_eq!(section.client_config("llama3").endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(split_keys("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_keys(" ").is_empty());
    }
}
