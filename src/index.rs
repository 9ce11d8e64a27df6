//! In-memory embedding index.
//!
//! Holds one [`EmbeddingRecord`] per ingested segment for the lifetime of
//! the process. Ingestion happens once at startup; records are never
//! mutated or deleted afterwards, so queries need no locking.

use anyhow::{bail, Context, Result};

use crate::embedding::{cosine_similarity, EmbeddingClient};
use crate::models::{EmbeddingRecord, ScoredSegment, Segment};

#[derive(Default)]
pub struct EmbeddingIndex {
    records: Vec<EmbeddingRecord>,
    dims: Option<usize>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed each segment and append the records, one embed call per
    /// segment. All vectors must share one dimensionality; a mismatch
    /// means the backend switched models mid-ingest and is fatal.
    pub async fn ingest(
        &mut self,
        segments: Vec<Segment>,
        embedder: &dyn EmbeddingClient,
    ) -> Result<usize> {
        let count = segments.len();

        for segment in segments {
            let vector = embedder.embed(&segment.text).await.with_context(|| {
                format!("Failed to embed segment {} of {}", segment.index, segment.source)
            })?;

            match self.dims {
                None => self.dims = Some(vector.len()),
                Some(dims) if dims != vector.len() => bail!(
                    "Embedding dimensionality changed during ingestion: expected {}, got {}",
                    dims,
                    vector.len()
                ),
                Some(_) => {}
            }

            self.records.push(EmbeddingRecord { vector, segment });
        }

        Ok(count)
    }

    /// Return up to `max_results` records scoring at least `min_score`
    /// against `vector`, ordered by descending cosine similarity. Ties
    /// keep insertion order (the sort is stable). An empty result is not
    /// an error.
    pub fn query(&self, vector: &[f32], min_score: f32, max_results: usize) -> Vec<ScoredSegment> {
        let mut hits: Vec<ScoredSegment> = self
            .records
            .iter()
            .filter_map(|record| {
                let score = cosine_similarity(vector, &record.vector);
                (score >= min_score).then(|| ScoredSegment {
                    segment: record.segment.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(max_results);
        hits
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
