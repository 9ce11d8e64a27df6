use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Token counter used for chunking: `heuristic` or `whitespace`.
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
    /// Maximum number of conversation turns kept as context.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    pub corpus: CorpusConfig,
    pub model: ModelConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

fn default_tokenizer() -> String {
    "heuristic".to_string()
}
fn default_history_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// A text file, or a directory scanned with `include_globs`.
    pub path: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Chat model name (e.g. `llama3`).
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Similarity score floor; matches below it are discarded.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            max_results: default_max_results(),
        }
    }
}

fn default_min_score() -> f32 {
    0.5
}
fn default_max_results() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    if config.history_size == 0 {
        anyhow::bail!("history_size must be >= 1");
    }

    if config.retrieval.max_results == 0 {
        anyhow::bail!("retrieval.max_results must be >= 1");
    }

    if !(-1.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0] (cosine similarity range)");
    }

    if !(0.0..=2.0).contains(&config.model.temperature) {
        anyhow::bail!("model.temperature must be in [0.0, 2.0]");
    }

    if config.model.name.is_empty() {
        anyhow::bail!("model.name must not be empty");
    }

    if config.corpus.path.as_os_str().is_empty() {
        anyhow::bail!("corpus.path must not be empty");
    }

    match config.tokenizer.as_str() {
        "heuristic" | "whitespace" => {}
        other => anyhow::bail!(
            "Unknown tokenizer: '{}'. Must be heuristic or whitespace.",
            other
        ),
    }

    Ok(())
}
