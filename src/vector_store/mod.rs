//! Vector store abstraction for Tubechat.
//!
//! Provides a trait-based interface for different vector database backends,
//! and the ephemeral per-session index built on top of them.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::VectorStoreProvider;
use crate::error::Result;
use crate::transcript::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};
use uuid::Uuid;

/// A document stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Video ID this document belongs to.
    pub video_id: String,
    /// Video title.
    pub video_title: String,
    /// Text content of this chunk.
    pub content: String,
    /// Start time in the video (seconds).
    pub start_seconds: f64,
    /// End time in the video (seconds).
    pub end_seconds: f64,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Order of this chunk in the video.
    pub chunk_order: i32,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document.
    pub fn new(
        video_id: String,
        video_title: String,
        content: String,
        start_seconds: f64,
        end_seconds: f64,
        embedding: Vec<f32>,
        chunk_order: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            video_title,
            content,
            start_seconds,
            end_seconds,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }

    /// Format timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_seconds)
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk upsert documents.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Remove every document.
    async fn clear(&self) -> Result<usize>;

    /// Get total document count.
    async fn document_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// A vector index owned by one session.
///
/// For the SQLite provider the database lives in its own temporary
/// directory, which is deleted when the index is torn down or dropped.
pub struct EphemeralIndex {
    // Field order matters: the store (and its connection) drops before the directory.
    store: Arc<dyn VectorStore>,
    dir: Option<TempDir>,
}

impl EphemeralIndex {
    /// Create an empty index for the given provider under `parent`.
    pub fn create(provider: VectorStoreProvider, parent: &Path) -> Result<Self> {
        match provider {
            VectorStoreProvider::Memory => Ok(Self {
                store: Arc::new(MemoryVectorStore::new()),
                dir: None,
            }),
            VectorStoreProvider::Sqlite => {
                std::fs::create_dir_all(parent)?;
                let dir = tempfile::Builder::new().prefix("index-").tempdir_in(parent)?;
                let store = SqliteVectorStore::new(&dir.path().join("vectors.db"))?;
                debug!("Created session index at {:?}", dir.path());
                Ok(Self {
                    store: Arc::new(store),
                    dir: Some(dir),
                })
            }
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Directory holding the index, if it is on disk.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }

    /// Clear the index and delete its directory.
    pub async fn teardown(self) -> Result<()> {
        let removed = self.store.clear().await?;
        let Self { store, dir } = self;
        drop(store);
        if let Some(dir) = dir {
            let path = dir.path().to_path_buf();
            dir.close()?;
            info!("Removed session index at {:?} ({} documents)", path, removed);
        }
        Ok(())
    }
}
