//! # pagegrep CLI
//!
//! ## Usage
//!
//! ```bash
//! pagegrep --config ./config/pagegrep.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagegrep init` | Create the SQLite database and schema |
//! | `pagegrep index <bucket> <key>` | OCR one object and index it |
//! | `pagegrep remove <bucket> <key>` | Remove one object from the index |
//! | `pagegrep ingest <events.json>` | Process a change-event batch file |
//! | `pagegrep search '<json>'` | Run a search-DSL query |
//! | `pagegrep serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! pagegrep init
//! pagegrep index scans invoices/2024-03.png
//! pagegrep search '{"search":{"text":"TOTAL","page_number":1,"coordinates":[[0.5,0.3],[1.0,0.0]]}}'
//! pagegrep serve
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pagegrep_core::events::ChangeEvent;
use pagegrep::{config, ingest, migrate, search, server};

/// pagegrep: spatial text search over OCR'd images in object storage.
#[derive(Parser)]
#[command(
    name = "pagegrep",
    about = "Spatial text search over OCR'd images in object storage buckets",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pagegrep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// OCR an object and add it to the index (an OBJECT_CREATED event).
    Index {
        bucket: String,
        key: String,
    },

    /// Remove an object from the index (an OBJECT_REMOVED event).
    Remove {
        bucket: String,
        key: String,
    },

    /// Process a batch of change events from a JSON file.
    ///
    /// The file holds an array of `{event_name, bucket, key}` objects or an
    /// S3 bucket notification (`{"Records": [...]}`).
    Ingest {
        path: PathBuf,
    },

    /// Run a search-DSL query and print matches grouped by bucket.
    Search {
        /// The query as JSON.
        query: String,

        /// Restrict results to this bucket (repeatable).
        #[arg(long = "bucket")]
        buckets: Vec<String>,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { bucket, key } => {
            ingest::run_events(&cfg, vec![ChangeEvent::created(bucket, key)]).await?;
        }
        Commands::Remove { bucket, key } => {
            ingest::run_events(&cfg, vec![ChangeEvent::removed(bucket, key)]).await?;
        }
        Commands::Ingest { path } => {
            let events = ingest::load_events(&path)?;
            ingest::run_events(&cfg, events).await?;
        }
        Commands::Search { query, buckets } => {
            search::run_search(&cfg, &query, buckets).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
