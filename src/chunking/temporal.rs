//! Time-based chunking implementation.
//!
//! Splits transcripts into chunks based on time intervals.

use super::{ChunkingConfig, ContentChunk};
use crate::transcript::{Transcript, TranscriptSegment};

/// Time-based chunker.
///
/// Groups consecutive caption segments into windows of roughly
/// `target_duration` seconds. Each segment lands in exactly one chunk.
pub struct TemporalChunker;

impl TemporalChunker {
    pub fn new() -> Self {
        Self
    }

    pub fn chunk(&self, transcript: &Transcript, config: &ChunkingConfig) -> Vec<ContentChunk> {
        let target_duration = config.target_duration.max(1) as f64;
        let mut chunks: Vec<ContentChunk> = Vec::new();
        let mut current: Vec<&TranscriptSegment> = Vec::new();
        let mut window_start = 0.0;

        for segment in &transcript.segments {
            if segment.text.trim().is_empty() {
                continue;
            }

            if current.is_empty() {
                window_start = segment.start_seconds;
            } else if segment.start_seconds >= window_start + target_duration {
                chunks.push(Self::build_chunk(&current, chunks.len() as i32));
                current.clear();
                window_start = segment.start_seconds;
            }

            current.push(segment);
        }

        if !current.is_empty() {
            chunks.push(Self::build_chunk(&current, chunks.len() as i32));
        }

        // Fold a short tail into its predecessor
        if chunks.len() > 1 {
            let too_short = chunks
                .last()
                .is_some_and(|c| c.duration() < config.min_duration as f64);
            if too_short {
                if let (Some(tail), Some(prev)) = (chunks.pop(), chunks.last_mut()) {
                    prev.content.push(' ');
                    prev.content.push_str(&tail.content);
                    prev.end_seconds = prev.end_seconds.max(tail.end_seconds);
                }
            }
        }

        chunks
    }

    fn build_chunk(segments: &[&TranscriptSegment], order: i32) -> ContentChunk {
        let content = segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let start = segments.first().map(|s| s.start_seconds).unwrap_or(0.0);
        let end = segments
            .iter()
            .map(|s| s.end_seconds)
            .fold(start, f64::max);

        ContentChunk::new(content, start, end, order)
    }
}

impl Default for TemporalChunker {
    fn default() -> Self {
        Self::new()
    }
}
