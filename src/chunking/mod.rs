//! Content chunking for breaking transcripts into searchable segments.

mod temporal;

pub use temporal::TemporalChunker;

use crate::config::ChunkingSettings;
use crate::transcript::format_timestamp;
use serde::{Deserialize, Serialize};

/// A chunk of content from a video transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Order of this chunk in the video.
    pub order: i32,
}

impl ContentChunk {
    /// Create a new content chunk.
    pub fn new(content: String, start_seconds: f64, end_seconds: f64, order: i32) -> Self {
        Self {
            content,
            start_seconds,
            end_seconds,
            order,
        }
    }

    /// Duration of this chunk in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Format timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_seconds)
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk duration in seconds.
    pub target_duration: u32,
    /// Minimum duration of the final chunk before it is merged backwards.
    pub min_duration: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&ChunkingSettings::default())
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            target_duration: settings.target_chunk_seconds,
            min_duration: settings.min_chunk_seconds,
        }
    }
}
