//! # ragbox CLI
//!
//! ```bash
//! ragbox ingest ./docs                      # upsert changed files, prune deleted ones
//! ragbox ingest ./docs --extensions md,txt --no-prune
//! ragbox status                             # sync status + server stats
//! ragbox search "connection pooling" --top-k 3
//! ragbox query "How do I configure replicas?"
//! ragbox documents list
//! ragbox serve --bind 127.0.0.1:8080        # in-memory dev server
//! ```
//!
//! Every command that talks to a server accepts `--url` and `--timeout`,
//! which override `[client]` in the `--config` file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use ragbox::client::RagboxClient;
use ragbox::config::{load_config, normalize_extensions, Config};
use ragbox::ingest::{run_ingest, IngestOptions};
use ragbox::progress::ProgressMode;
use ragbox::{documents, logging, search, server, status};

/// ragbox: incremental document sync for RAG in a Box.
#[derive(Parser)]
#[command(
    name = "ragbox",
    version,
    about = "Client and incremental ingest tool for RAG in a Box",
    long_about = "Pushes documents to a RAG in a Box server, uploading only what changed \
    and pruning what was removed, and runs searches and queries against it."
)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL (overrides `[client].base_url`).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Request timeout in seconds (overrides `[client].timeout_secs`).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Debug logging for ragbox crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every matching file under a directory.
    ///
    /// Each file becomes a document whose id is its relative path with
    /// separators replaced by `_`. Unchanged files are reported as such by
    /// the server; files no longer on disk are pruned unless `--no-prune`.
    Ingest {
        /// Directory to scan.
        dir: PathBuf,

        /// Comma-separated extensions, with or without the leading dot.
        #[arg(long, value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Only scan the top level of the directory.
        #[arg(long)]
        no_recursive: bool,

        /// Keep server documents that have no file on disk.
        #[arg(long)]
        no_prune: bool,

        /// Progress on stderr. Defaults to `human` on a TTY, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show sync status and server statistics.
    Status,

    /// List or delete documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },

    /// Ranked chunks for a query, without answer generation.
    Search {
        query: String,

        /// Number of results (server default when omitted or 0).
        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        collection: Option<String>,
    },

    /// Ask a question and print the generated answer with its sources.
    Query {
        question: String,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        collection: Option<String>,
    },

    /// Check server liveness and readiness.
    Health,

    /// Run an in-memory development server.
    Serve {
        /// Listen address (overrides `[server].bind`).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print a shell completion script to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum DocumentsAction {
    /// List stored documents.
    List,
    /// Delete one document by id.
    Delete { id: String },
    /// Delete every document.
    Clear {
        /// Confirm deletion of everything.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "ragbox", &mut std::io::stdout());
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(url) = &cli.url {
        cfg.client.base_url = url.clone();
    }
    if let Some(timeout) = cli.timeout {
        anyhow::ensure!(timeout > 0, "--timeout must be > 0");
        cfg.client.timeout_secs = timeout;
    }

    match cli.command {
        Commands::Ingest {
            dir,
            extensions,
            no_recursive,
            no_prune,
            progress,
        } => {
            let mut opts = IngestOptions::from_config(dir, &cfg);
            if let Some(exts) = extensions {
                opts.extensions = normalize_extensions(&exts);
                anyhow::ensure!(!opts.extensions.is_empty(), "--extensions must not be empty");
            }
            if no_recursive {
                opts.recursive = false;
            }
            if no_prune {
                opts.prune = false;
            }
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            let client = RagboxClient::from_config(&cfg.client)?;
            run_ingest(client, &opts, reporter.as_ref()).await?;
        }
        Commands::Status => {
            status::run_status(&RagboxClient::from_config(&cfg.client)?).await?;
        }
        Commands::Documents { action } => {
            let client = RagboxClient::from_config(&cfg.client)?;
            match action {
                DocumentsAction::List => documents::run_list(&client).await?,
                DocumentsAction::Delete { id } => documents::run_delete(client, &id).await?,
                DocumentsAction::Clear { yes } => documents::run_clear(client, yes).await?,
            }
        }
        Commands::Search {
            query,
            top_k,
            collection,
        } => {
            let client = RagboxClient::from_config(&cfg.client)?;
            search::run_search(&client, &query, top_k, collection).await?;
        }
        Commands::Query {
            question,
            top_k,
            collection,
        } => {
            let client = RagboxClient::from_config(&cfg.client)?;
            search::run_query(&client, &question, top_k, collection).await?;
        }
        Commands::Health => {
            status::run_health(&RagboxClient::from_config(&cfg.client)?).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
