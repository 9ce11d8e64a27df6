use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Append-only transcript of one process run.
///
/// The filename encodes the run start time and the settings that shaped
/// the answers, so repeated runs with different settings produce
/// distinguishable logs. The start time is passed in once at
/// construction, never read from ambient state.
pub struct TranscriptWriter {
    path: PathBuf,
}

impl TranscriptWriter {
    pub fn new(dir: &Path, started_at: NaiveDateTime, config: &Config) -> Self {
        let filename = format!(
            "{}_mo_{}_to_{}_te{}_tss{}_msr{}.txt",
            started_at.format("%Y%m%d_%H%M"),
            config.model.name,
            config.chunking.max_tokens,
            config.model.temperature,
            config.retrieval.min_score,
            config.retrieval.max_results,
        );

        Self {
            path: dir.join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one completed exchange. The file is created on first write,
    /// so a run with no successful exchange leaves no transcript behind.
    pub fn append(&self, question: &str, answer: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open transcript: {}", self.path.display()))?;

        write!(file, "User: {}\nModel: {}\n\n", question, answer)
            .with_context(|| format!("Failed to append to transcript: {}", self.path.display()))?;

        Ok(())
    }
}
