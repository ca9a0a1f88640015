//! # Dojo CLI (`dojo`)
//!
//! Terminal front-end for the academy knowledge base and hybrid assistant.
//!
//! ## Usage
//!
//! ```bash
//! dojo --config ./config/dojo.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dojo ingest <paths…>` | Add files or directories to the knowledge base |
//! | `dojo list` | List stored documents |
//! | `dojo get <id>` | Show one document and its chunks |
//! | `dojo remove <id>` | Remove a document |
//! | `dojo search "<query>"` | Keyword search over chunks |
//! | `dojo ask "<question>"` | One hybrid question (documents + live API) |
//! | `dojo chat` | Interactive assistant session |
//! | `dojo reprocess <id>` | Re-clean a document's extracted text |
//! | `dojo reindex` | Regenerate every chunk |
//! | `dojo clear --yes` | Delete all documents and chunks |
//! | `dojo stats` | Corpus statistics |
//! | `dojo health` | Probe the academy API |
//!
//! Set `RUST_LOG=dojo_rag=debug` for diagnostic logging on stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use dojo_rag::chat::TranscriptEntry;
use dojo_rag::config;
use dojo_rag::notify::StderrNotifier;
use dojo_rag::service::RagService;
use dojo_rag::{get, health, ingest, search, stats};

/// Dojo: knowledge base and hybrid assistant for martial-arts academies.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dojo.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dojo",
    about = "Dojo: knowledge base and hybrid assistant for martial-arts academies",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dojo.toml`. When the file does not exist, a
    /// storage-only default configuration is used.
    #[arg(long, global = true, default_value = "./config/dojo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files or directories.
    ///
    /// Directories are walked recursively; only files matching
    /// `ingest.include_globs` are picked up. Each file succeeds or fails
    /// on its own.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List stored documents.
    List,

    /// Show a document, its content, and its chunks.
    Get { id: String },

    /// Remove a document and its chunks.
    Remove { id: String },

    /// Keyword search over the knowledge base.
    Search {
        query: String,

        /// Score as a technique lookup (phrase, terms, and Krav Maga patterns).
        #[arg(long)]
        technique: bool,

        /// Restrict the search to one document.
        #[arg(long)]
        document: Option<String>,

        /// Maximum number of results (default 20, or 10 with `--technique`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask one question; combines documents with live academy data.
    Ask {
        question: String,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat session.
    ///
    /// `/limpar` clears the history, `/sair` or end of input exits.
    Chat,

    /// Re-clean the extracted text of a document.
    Reprocess { id: String },

    /// Regenerate every chunk from the stored documents.
    Reindex,

    /// Delete every document and chunk.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Show corpus statistics.
    Stats,

    /// Probe the academy API endpoints.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config not found, using defaults");
        config::Config::minimal()
    };

    let service = RagService::init_with_notifier(cfg, Arc::new(StderrNotifier)).await?;
    let result = run(&service, cli.command).await;
    service.shutdown().await;
    result
}

async fn run(service: &RagService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { paths } => {
            let failed = ingest::run_ingest(service, &paths).await?;
            if failed > 0 {
                anyhow::bail!("{} file(s) failed to ingest", failed);
            }
        }
        Commands::List => get::run_list(service)?,
        Commands::Get { id } => get::run_get(service, &id)?,
        Commands::Remove { id } => {
            if !service.remove_document(&id).await {
                anyhow::bail!("Document not found: {}", id);
            }
            println!("Removed {}.", id);
        }
        Commands::Search {
            query,
            technique,
            document,
            limit,
        } => {
            if technique {
                search::run_technique_search(service, &query, limit)?;
            } else {
                search::run_search(service, &query, document.as_deref(), limit)?;
            }
        }
        Commands::Ask { question, json } => {
            let response = service.query(&question).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if let Some(answer) = &response.answer {
                println!("{}", answer);
            } else {
                println!(
                    "❌ Erro: {}",
                    response.error.as_deref().unwrap_or("Não foi possível processar sua pergunta")
                );
                if !response.fallback.is_empty() {
                    println!();
                    println!("{}", dojo_rag::compose::document_answer(&response.fallback));
                }
            }
        }
        Commands::Chat => run_chat(service).await?,
        Commands::Reprocess { id } => {
            let doc = service.reprocess(&id).await?;
            println!("Reprocessed {} ({} words).", doc.id, doc.word_count);
        }
        Commands::Reindex => {
            let count = service.reindex().await;
            println!("Reindexed: {} chunks.", count);
        }
        Commands::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear the knowledge base without --yes");
            }
            service.clear_knowledge().await;
            println!("Knowledge base cleared.");
        }
        Commands::Stats => stats::run_stats(service).await?,
        Commands::Health => match service.health_check().await {
            Some(report) => {
                health::print_health(&report);
                if !report.all_healthy() {
                    anyhow::bail!("one or more endpoints are unhealthy");
                }
            }
            None => println!("Live data gateway is disabled (gateway.enabled = false)."),
        },
    }

    Ok(())
}

async fn run_chat(service: &RagService) -> anyhow::Result<()> {
    let session = service.chat().await;

    for entry in session.transcript() {
        print_entry(&entry);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/sair" => break,
            "/limpar" => {
                session.clear_history().await;
                println!("Histórico limpo.");
            }
            message => {
                if let Some(reply) = session.submit(message).await {
                    println!("{}\n", reply);
                }
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &TranscriptEntry) {
    match entry {
        TranscriptEntry::User(text) => println!("> {}", text),
        TranscriptEntry::Assistant(text) => println!("{}\n", text),
        TranscriptEntry::Loading => {}
    }
}
