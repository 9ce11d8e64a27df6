use anyhow::{Context, Result};
use std::sync::Arc;

use crate::embedding::EmbeddingClient;
use crate::index::EmbeddingIndex;
use crate::models::ScoredSegment;

/// Turns a query string into the top matching corpus segments.
///
/// Pure function of the (startup-frozen) index state and the query text;
/// no side effects. The query is embedded with the same client used at
/// ingestion so both live in the same vector space.
pub struct Retriever {
    index: EmbeddingIndex,
    embedder: Arc<dyn EmbeddingClient>,
    min_score: f32,
    max_results: usize,
}

impl Retriever {
    pub fn new(
        index: EmbeddingIndex,
        embedder: Arc<dyn EmbeddingClient>,
        min_score: f32,
        max_results: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            min_score,
            max_results,
        }
    }

    /// Top matching segment texts for `query`, scores discarded.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query)
            .await?
            .into_iter()
            .map(|hit| hit.segment.text)
            .collect())
    }

    /// Scored variant, used by the `search` debug command.
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<ScoredSegment>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        Ok(self.index.query(&vector, self.min_score, self.max_results))
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use async_trait::async_trait;

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingClient for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 2];
            for word in text.split_whitespace() {
                match word {
                    "shipping" => v[0] += 1.0,
                    "returns" => v[1] += 1.0,
                    _ => {}
                }
            }
            Ok(v)
        }
    }

    async fn retriever(texts: &[&str], min_score: f32, max_results: usize) -> Retriever {
        let segments = texts
            .iter()
            .enumerate()
            .map(|(index, text)| Segment {
                source: "faq.txt".to_string(),
                index,
                text: text.to_string(),
            })
            .collect();

        let mut index = EmbeddingIndex::new();
        index.ingest(segments, &AxisEmbedder).await.unwrap();
        Retriever::new(index, Arc::new(AxisEmbedder), min_score, max_results)
    }

    #[tokio::test]
    async fn test_retrieve_returns_texts_only() {
        let retriever = retriever(&["shipping info", "returns policy"], 0.5, 5).await;
        let hits = retriever.retrieve("shipping").await.unwrap();
        assert_eq!(hits, vec!["shipping info".to_string()]);
    }

    #[tokio::test]
    async fn test_retrieve_empty_when_nothing_clears_floor() {
        let retriever = retriever(&["returns policy"], 0.5, 5).await;
        let hits = retriever.retrieve("shipping").await.unwrap();
        assert!(hits.is_empty());
    }
}
