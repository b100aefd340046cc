//! # SR&ED Harness CLI (`sred`)
//!
//! ## Usage
//!
//! ```bash
//! sred --config ./config/sred.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sred init` | Create the SQLite database and schema |
//! | `sred ingest <zip>` | Chunk, tag, and store the text files of an archive |
//! | `sred evidence` | List chunks with source locations |
//! | `sred search "<query>"` | Rank chunks against a query |
//! | `sred draft` | Assemble report sections with citations |
//! | `sred export` | Write the draft as a Markdown report |
//! | `sred ip-scout "<query>"` | Rank seed patents and draft a claim skeleton |
//! | `sred stats` | Corpus counts and per-facet breakdown |
//! | `sred serve` | Start the HTTP server |
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG=debug` for
//! per-document ingestion and retrieval detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sred_harness::{
    config, draft, evidence, export, ingest, ip_scout, migrate, search, server, stats,
};

/// SR&ED Harness CLI: evidence ingestion and retrieval for SR&ED drafts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sred.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sred",
    about = "Evidence ingestion, facet tagging, and TF-IDF retrieval for SR&ED drafts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sred.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents, chunks, and tags
    /// tables. Safe to run repeatedly.
    Init,

    /// Ingest a zip archive of project evidence.
    ///
    /// Entries whose extension is listed in `[ingest].extensions` are
    /// chunked, tagged, and stored; everything else is ignored.
    Ingest {
        /// Path to the zip archive.
        archive: PathBuf,

        /// Project id recorded on each document (defaults to `[ingest].project_id`).
        #[arg(long)]
        project: Option<String>,
    },

    /// List stored chunks with their source path and offsets.
    Evidence {
        /// Only chunks tagged with this facet.
        #[arg(long)]
        facet: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Rank chunks against a query with TF-IDF cosine similarity.
    Search {
        /// Free-text query.
        query: String,

        /// Restrict candidates to chunks carrying any of these facets (repeatable).
        #[arg(long = "facet")]
        facets: Vec<String>,

        /// Maximum number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        limit: Option<i64>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Assemble draft sections and citations from the configured categories.
    Draft {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Render the draft as a Markdown report.
    Export {
        /// Output file path. Writes to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Rank the seed patent list against a query and print a claim skeleton.
    IpScout {
        /// Free-text description of the invention.
        query: String,

        /// Maximum number of patents (defaults to `[ip_scout].top_k`).
        #[arg(long)]
        limit: Option<i64>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show document, chunk, and tag counts.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { archive, project } => {
            ingest::run_ingest(&cfg, &archive, project.as_deref()).await?;
        }
        Commands::Evidence { facet, json } => {
            evidence::run_evidence(&cfg, facet.as_deref(), json).await?;
        }
        Commands::Search {
            query,
            facets,
            limit,
            json,
        } => {
            search::run_search(&cfg, &query, &facets, limit, json).await?;
        }
        Commands::Draft { json } => {
            draft::run_draft(&cfg, json).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::IpScout { query, limit, json } => {
            ip_scout::run_ip_scout(&cfg, &query, limit, json)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
