//! # askdoc CLI
//!
//! The `askdoc` binary runs the HTTP API server and provides local commands
//! for database setup, ingestion, and search.
//!
//! ## Usage
//!
//! ```bash
//! askdoc --config ./config/askdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdoc init` | Create the SQLite database and run schema migrations |
//! | `askdoc ingest <path>` | Index every supported file under a directory |
//! | `askdoc search "<query>"` | Query the index and print ranked fragments |
//! | `askdoc sources` | List the document catalog |
//! | `askdoc serve` | Start the HTTP API server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use askdoc::{config, db, ingest, migrate, registry::DocumentRegistry, search, server};

/// askdoc — a document question-answering backend with pluggable content
/// storage.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/askdoc.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "askdoc",
    about = "askdoc — a document question-answering backend with pluggable content storage",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunk tables. Only needed
    /// for the `sqlite` backend; idempotent.
    Init,

    /// Index every supported file under a directory.
    ///
    /// Walks the directory, extracts text from PDF/DOCX/text files, chunks
    /// it, and stores it in the configured backend. Unsupported or broken
    /// files are skipped with a warning.
    Ingest {
        /// Directory to scan.
        path: PathBuf,
    },

    /// Query the index and print ranked fragments.
    Search {
        /// The search query string.
        query: String,
    },

    /// List the document catalog.
    Sources,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind`, restores the
    /// catalog from disk, and serves until terminated.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path } => {
            let facade = search::resolve(&cfg).await?;
            let registry = ingest::restore_documents(&cfg, &facade).await?;
            let (indexed, skipped) = ingest::ingest_dir(&cfg, &registry, &facade, &path).await?;
            println!("ingest {}", path.display());
            println!("  indexed: {}", indexed);
            println!("  skipped: {}", skipped);
            println!("ok");
        }
        Commands::Search { query } => {
            let facade = search::resolve(&cfg).await?;
            ingest::restore_documents(&cfg, &facade).await?;
            let hits = facade.search(&query).await?;
            if hits.is_empty() {
                println!("no results");
            } else {
                for (i, hit) in hits.iter().enumerate() {
                    let snippet: String = hit.text.chars().take(160).collect();
                    println!("{}. [{:.3}] {}", i + 1, hit.score, snippet);
                }
            }
        }
        Commands::Sources => {
            let registry = DocumentRegistry::load(&ingest::snapshot_path(&cfg));
            let entries = registry.list();
            if entries.is_empty() {
                println!("no documents");
            } else {
                for meta in entries {
                    println!(
                        "{}  {}  {}  {} bytes",
                        meta.id, meta.doc_type, meta.status, meta.size_bytes
                    );
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
