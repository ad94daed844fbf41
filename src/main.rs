//! # Hindsight CLI
//!
//! The `hindsight` binary drives the history question-answering service:
//! database initialization, batch ingestion, one-shot questions, and the
//! HTTP API used by the collector extension.
//!
//! ## Usage
//!
//! ```bash
//! hindsight --config ./config/hindsight.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hindsight init` | Create the SQLite database and schema |
//! | `hindsight ingest <file.json>` | Ingest a JSON batch of history records |
//! | `hindsight ask "<question>"` | Answer a question over ingested history |
//! | `hindsight serve` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! hindsight init --config ./config/hindsight.toml
//!
//! # Ingest a collector export, replacing superseded records
//! hindsight ingest ./export.json --user alice
//!
//! # Rebuild the collection from scratch
//! hindsight ingest ./export.json --user alice --rebuild
//!
//! # Ask about your history
//! hindsight ask "what songs did I listen to yesterday" --user alice
//!
//! # Start the API server
//! hindsight serve
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hindsight::ask::run_ask;
use hindsight::config::load_config;
use hindsight::ingest::run_ingest;
use hindsight::models::HistoryBatch;
use hindsight::server::run_server;
use hindsight::store::SqliteStore;

/// Hindsight — retrieval-augmented question answering over your browsing
/// history.
#[derive(Parser)]
#[command(
    name = "hindsight",
    about = "Hindsight — retrieval-augmented question answering over your browsing history",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hindsight.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest a JSON batch of history records.
    ///
    /// The file holds `{ "items": [...], "user_id": "..." }` as produced by
    /// the collector. Records are upserted under stable identifiers unless
    /// `--rebuild` is given.
    Ingest {
        /// Path to the batch file.
        file: PathBuf,

        /// Ingest into this user's collection (overrides the batch's user).
        #[arg(long)]
        user: Option<String>,

        /// Drop the collection and rebuild it from this batch.
        #[arg(long)]
        rebuild: bool,

        /// Show item and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question over ingested history.
    Ask {
        /// The question.
        question: String,

        /// Ask against this user's collection.
        #[arg(long)]
        user: Option<String>,

        /// Number of results to answer from.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::connect(&config).await?;
            store.migrate().await?;
            store.close().await;
            println!("initialized {}", config.db.path.display());
        }

        Commands::Ingest {
            file,
            user,
            rebuild,
            dry_run,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read batch file: {}", file.display()))?;
            let mut batch: HistoryBatch =
                serde_json::from_str(&content).with_context(|| "Failed to parse batch file")?;
            if user.is_some() {
                batch.user_id = user;
            }

            let store = SqliteStore::connect(&config).await?;
            store.migrate().await?;
            let summary = run_ingest(&config, &store, &batch, rebuild, dry_run).await?;
            store.close().await;

            if dry_run {
                println!("ingest {} (dry-run)", file.display());
                println!("  items found: {}", summary.items);
                println!("  estimated chunks: {}", summary.chunks_written);
            } else {
                println!("ingest {}", file.display());
                println!("  user: {}", summary.user_id);
                println!("  items: {}", summary.items);
                println!("  chunks written: {}", summary.chunks_written);
                println!("  replaced: {}", summary.replaced);
                println!("ok");
            }
        }

        Commands::Ask {
            question,
            user,
            top_k,
        } => {
            let store = SqliteStore::connect(&config).await?;
            store.migrate().await?;
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            let response = run_ask(&config, &store, user.as_deref(), &question, top_k).await?;
            store.close().await;

            println!("{}", response.answer);
            if !response.sources.is_empty() {
                println!();
                println!("Sources:");
                for (i, source) in response.sources.iter().enumerate() {
                    println!("  [#{}] {} — {} ({})", i + 1, source.title, source.url, source.meta);
                }
            }
        }

        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hindsight=info")),
                )
                .init();
            run_server(&config).await?;
        }
    }

    Ok(())
}
