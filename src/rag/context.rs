//! Context building for RAG responses.

use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use std::sync::Arc;

/// Builds context from search results for RAG.
pub struct ContextBuilder {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_chunks: usize,
    min_score: f32,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            max_chunks: 5,
            min_score: 0.2,
        }
    }

    /// Set the maximum number of context chunks.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Build context for a query.
    pub async fn build(&self, query: &str) -> Result<Vec<ContextChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .vector_store
            .search_with_threshold(&query_embedding, self.max_chunks, self.min_score)
            .await?;

        Ok(results.into_iter().map(ContextChunk::from).collect())
    }
}

/// Format context chunks for inclusion in a prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("---\n[{}] @ {}\n{}\n---", i + 1, chunk.timestamp, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Document, SearchResult};

    #[test]
    fn test_format_context_for_prompt() {
        let chunks: Vec<ContextChunk> = vec![
            SearchResult {
                document: Document::new(
                    "dQw4w9WgXcQ".to_string(),
                    "Video".to_string(),
                    "Never gonna give you up".to_string(),
                    43.0,
                    60.0,
                    vec![],
                    0,
                ),
                score: 0.9,
            }
            .into(),
        ];

        assert_eq!(chunks[0].url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=43s");
        assert_eq!(
            format_context_for_prompt(&chunks),
            "---\n[1] @ 00:43\nNever gonna give you up\n---"
        );
        assert_eq!(format_context_for_prompt(&[]), "");
    }
}
