//! RAG (Retrieval-Augmented Generation) for answering questions about a video.
//!
//! Retrieval runs against the session's index; generation goes through the
//! [`Generator`] trait so any chat-completion backend can be plugged in.

pub mod context;
mod generator;
mod response;

pub use context::ContextBuilder;
pub use generator::OpenAIGenerator;
pub use response::{RagEngine, RagResponse};

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::SearchResult;
use crate::video_source::VideoRef;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// A search result with formatted context for display.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    /// Video ID.
    pub video_id: String,
    /// Formatted timestamp (e.g., "02:34").
    pub timestamp: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
    /// Watch URL at this chunk's start.
    pub url: String,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        let doc = result.document;
        Self {
            url: VideoRef::from_id(&doc.video_id).url_with_timestamp(doc.start_seconds),
            timestamp: doc.format_timestamp(),
            video_id: doc.video_id,
            start_seconds: doc.start_seconds,
            content: doc.content,
            score: result.score,
        }
    }
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// One message sent to the chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Trait for chat-completion backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the assistant's reply to the given conversation.
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String>;
}

/// Builds model clients bound to a user-supplied API key.
pub trait ModelProvider: Send + Sync {
    /// Embedder authenticated with `api_key`.
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn Embedder>>;

    /// Chat generator authenticated with `api_key`.
    fn generator(&self, api_key: &str) -> Result<Arc<dyn Generator>>;
}
