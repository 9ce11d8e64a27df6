use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::Document;

/// Load the corpus from the configured path.
///
/// A file path yields a single document; a directory is walked and every
/// file matching `corpus.include_globs` becomes one document. Documents
/// are sorted by source path for deterministic ingestion order.
pub fn load_corpus(config: &Config) -> Result<Vec<Document>> {
    let root = &config.corpus.path;
    if !root.exists() {
        bail!("Corpus path does not exist: {}", root.display());
    }

    if root.is_file() {
        return Ok(vec![read_document(root)?]);
    }

    let include_set = build_globset(&config.corpus.include_globs)?;
    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !include_set.is_match(relative) {
            continue;
        }

        documents.push(read_document(path)?);
    }

    documents.sort_by(|a, b| a.source.cmp(&b.source));

    if documents.is_empty() {
        bail!(
            "No corpus documents found under {} (include globs: {:?})",
            root.display(),
            config.corpus.include_globs
        );
    }

    Ok(documents)
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    Ok(Document {
        source: path.display().to_string(),
        text,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
