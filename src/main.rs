//! # askdocs CLI
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs init` | Write a commented example configuration file |
//! | `askdocs ingest` | Index PDFs under the documents root into the vector store |
//! | `askdocs ask "<question>"` | Answer a question from the indexed documents |
//! | `askdocs serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use askdocs::{ask, config, ingest, server, store::ChromaStore};

/// askdocs: retrieval-augmented question answering over local PDF
/// collections.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; `askdocs init` writes a commented starting point.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "Retrieval-augmented question answering for local PDF collections",
    version,
    long_about = "askdocs indexes local PDF collections into a vector store and answers \
    questions against them: retrieved chunks are assembled into an instruction prompt and a \
    language model answers from that context alone, with sources reported back."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented example configuration file.
    ///
    /// Refuses to overwrite an existing file.
    Init,

    /// Index PDFs under the documents root into the vector store.
    ///
    /// Extracts, cleans, and chunks every matching PDF, then adds the
    /// chunks with source metadata. Files that fail to parse are logged
    /// and skipped. Re-running appends; it does not replace earlier runs.
    Ingest {
        /// Show file and chunk counts without writing to the store.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of PDFs to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question from the indexed documents.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind` and exposes `POST /ask` and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // init runs before config loading: it writes the config.
    if matches!(&cli.command, Commands::Init) {
        config::scaffold_config(&cli.config)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Ingest { dry_run, limit } => {
            let store = ChromaStore::new(&cfg.store, &cfg.embedding)?;
            ingest::run_ingest(&cfg, &store, dry_run, limit).await?;
        }
        Commands::Ask { question, top_k } => {
            ask::run_ask(&cfg, &question, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
