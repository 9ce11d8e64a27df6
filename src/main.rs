//! # ragchat CLI
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat chat` | Ingest the corpus, then start the interactive chat loop |
//! | `ragchat search "<query>"` | Retrieval debug: print scored segments, no generation |
//!
//! Both commands ingest the configured corpus at startup; ingestion
//! failures are fatal before any interaction begins.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ragchat::backend::OllamaChat;
use ragchat::chat::ChatOrchestrator;
use ragchat::chunk;
use ragchat::config::{self, Config};
use ragchat::corpus;
use ragchat::embedding::{EmbeddingClient, OllamaEmbedder};
use ragchat::index::EmbeddingIndex;
use ragchat::memory::ConversationWindow;
use ragchat::repl;
use ragchat::retrieve::Retriever;
use ragchat::transcript::TranscriptWriter;

/// ragchat — a retrieval-augmented streaming chat CLI for local models.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "A retrieval-augmented streaming chat CLI for local models",
    version,
    long_about = "ragchat loads a text corpus, embeds it into an in-memory vector index, and \
    routes console prompts through similarity-search retrieval into a streaming chat model \
    behind an Ollama-compatible API, logging every exchange to a per-run transcript file."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./ragchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat loop.
    ///
    /// Reads one prompt per line from stdin, streams the model's answer,
    /// and appends each completed exchange to the transcript file.
    /// Type `exit` to leave.
    Chat,

    /// Retrieval debug: print the scored segments for a query.
    ///
    /// Runs the same embed-and-search step the chat loop uses, without
    /// calling the generation backend. Useful for tuning the score floor
    /// and chunk size.
    Search {
        /// The query string.
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Chat => run_chat(&cfg).await,
        Commands::Search { query } => run_search(&cfg, &query).await,
    }
}

/// Composition root for the retrieval side: corpus → chunker → index.
/// Runs the one-time startup ingestion; any failure here is fatal.
async fn build_retriever(cfg: &Config) -> Result<Retriever> {
    let counter = chunk::counter_for(&cfg.tokenizer)?;
    let documents = corpus::load_corpus(cfg)?;

    let mut segments = Vec::new();
    for document in &documents {
        segments.extend(chunk::split_document(document, cfg.chunking.max_tokens, counter)?);
    }

    println!(
        "Indexing {} segments from {} document(s)...",
        segments.len(),
        documents.len()
    );

    let embedder: Arc<dyn EmbeddingClient> = Arc::new(OllamaEmbedder::new(
        &cfg.model.base_url,
        &cfg.model.embedding_model,
        Duration::from_secs(cfg.model.timeout_secs),
    )?);

    let mut index = EmbeddingIndex::new();
    index
        .ingest(segments, embedder.as_ref())
        .await
        .context("Corpus ingestion failed")?;

    Ok(Retriever::new(
        index,
        embedder,
        cfg.retrieval.min_score,
        cfg.retrieval.max_results,
    ))
}

async fn run_chat(cfg: &Config) -> Result<()> {
    let retriever = build_retriever(cfg).await?;

    // Run start time is captured once, here, and passed down explicitly.
    let started_at = chrono::Local::now().naive_local();
    let transcript = TranscriptWriter::new(Path::new("."), started_at, cfg);
    println!("Transcript: {}", transcript.path().display());

    let backend = OllamaChat::new(
        &cfg.model.base_url,
        &cfg.model.name,
        Duration::from_secs(cfg.model.timeout_secs),
    )?;

    let mut orchestrator = ChatOrchestrator::new(
        Box::new(backend),
        retriever,
        ConversationWindow::new(cfg.history_size),
        transcript,
        cfg.model.temperature,
    );

    repl::run_loop(&mut orchestrator).await
}

async fn run_search(cfg: &Config, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let retriever = build_retriever(cfg).await?;
    let hits = retriever.retrieve_scored(query).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} #{}",
            i + 1,
            hit.score,
            hit.segment.source,
            hit.segment.index
        );
        println!("    excerpt: \"{}\"", hit.segment.text.replace('\n', " ").trim());
        println!();
    }

    Ok(())
}
