//! cheatdoc - programming language cheatsheet generator
//!
//! Collects web references for language features and has an LLM turn them
//! into structured usage documentation.

use anyhow::Result;
use cheatdoc::cli::{self, Cli, Commands};
use cheatdoc::generate::GenerationMode;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging, RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let root = Path::new(&cli.root);

    // Execute command
    match cli.command {
        Commands::Init(args) => {
            cli::init(root, args.force)?;
        }

        Commands::Feature(args) => {
            let modes = GenerationMode::from_flags(args.outline, args.usage);
            cli::feature(root, &args.address, &modes, args.dry_run, cli.format).await?;
        }

        Commands::References(args) => {
            cli::references(root, &args.address, cli.format).await?;
        }

        Commands::Tree(args) => {
            cli::tree(root, &args.address, cli.format)?;
        }

        Commands::Status(args) => {
            cli::status(root, &args.address, cli.format)?;
        }

        Commands::Cache(args) => {
            cli::cache(root, args.url.as_deref(), cli.format)?;
        }

        Commands::Config => {
            cli::config(root, cli.format)?;
        }
    }

    Ok(())
}
