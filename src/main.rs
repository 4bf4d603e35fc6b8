//! # DriveScout CLI (`scout`)
//!
//! Finds documents in a shared Google Drive folder tree and ranks them
//! against a free-text query with an LLM.
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout crawl` | Print the folder index under the configured root |
//! | `scout catalog` | Print every candidate document |
//! | `scout search "<query>"` | Rank documents against a query |
//! | `scout providers` | List ranking providers and credential status |
//! | `scout serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # What folders does the crawler see?
//! scout crawl --config ./config/scout.toml
//!
//! # Ranked search with previews of the top hits
//! scout search "Paschal matins" --enrich
//!
//! # Machine-readable output, top 10 only
//! scout search "akathist" --json --limit 10
//! ```
//!
//! Logs go to stderr. Set `RUST_LOG` to adjust verbosity
//! (default `warn,drivescout=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use drivescout::{catalog, config, crawl, providers, search, server};

/// DriveScout: LLM-ranked search over a shared Drive folder tree.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/scout.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "DriveScout: LLM-ranked search over a shared Drive folder tree",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the folder tree and print the folder index.
    ///
    /// Walks breadth-first from `drive.root_folder_id` down to
    /// `drive.max_depth` levels. Folders that cannot be listed are skipped.
    Crawl,

    /// Crawl, then print every document of the configured MIME type.
    Catalog,

    /// Rank documents against a query.
    ///
    /// Runs crawl → catalog → rank, then optionally downloads the top
    /// results and attaches a text preview.
    Search {
        /// The search query string.
        query: String,

        /// Attach text previews to the top results.
        #[arg(long)]
        enrich: bool,

        /// Print the response as JSON.
        #[arg(long)]
        json: bool,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List ranking providers and whether their credentials are present.
    Providers,

    /// Start the JSON HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,drivescout=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // An empty query never needs a config or the network.
    if let Commands::Search { ref query, .. } = cli.command {
        if query.trim().is_empty() {
            println!("No results.");
            return Ok(());
        }
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Crawl => {
            crawl::run_crawl(&cfg).await?;
        }
        Commands::Catalog => {
            catalog::run_catalog(&cfg).await?;
        }
        Commands::Search {
            query,
            enrich,
            json,
            limit,
        } => {
            search::run_search(&cfg, &query, enrich, json, limit).await?;
        }
        Commands::Providers => {
            providers::list_providers(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
