//! CLI interface using clap
//!
//! Provides the command-line interface for cheatdoc

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};

/// cheatdoc - programming language cheatsheet generator
#[derive(Parser, Debug)]
#[command(name = "cheatdoc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the workspace (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".", env = "CHEATDOC_ROOT")]
    pub root: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a cheatdoc workspace
    Init(InitArgs),

    /// Generate content for a feature and everything below it
    Feature(FeatureArgs),

    /// Collect and rank references for a single feature
    References(ReferencesArgs),

    /// Print the feature tree of a language
    Tree(TreeArgs),

    /// Show generation progress of a feature tree
    Status(StatusArgs),

    /// Inspect the scraped page cache
    Cache(CacheArgs),

    /// Show configuration
    Config,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments for init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for feature command
#[derive(Parser, Debug)]
pub struct FeatureArgs {
    /// Feature address, e.g. "kotlin:syntax/loop"
    pub address: String,

    /// Generate outlines
    #[arg(long)]
    pub outline: bool,

    /// Generate description and usage (default)
    #[arg(long)]
    pub usage: bool,

    /// Print diffs instead of writing files
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for references command
#[derive(Parser, Debug)]
pub struct ReferencesArgs {
    /// Feature address, e.g. "kotlin:array"
    pub address: String,
}

/// Arguments for tree command
#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// Language id or feature address
    pub address: String,
}

/// Arguments for status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Language id or feature address
    pub address: String,
}

/// Arguments for cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Show the cached entry for a URL
    #[arg(short, long)]
    pub url: Option<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
