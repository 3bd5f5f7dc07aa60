//! In-process fakes for the external services, shared by unit tests.

use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::orchestrator::Orchestrator;
use crate::rag::{Generator, ModelProvider, PromptMessage};
use crate::transcript::{Transcript, TranscriptSegment};
use crate::video_source::{TranscriptFetcher, VideoRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const VIDEO_A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
pub const VIDEO_B: &str = "https://youtu.be/bbbbbbbbbbb";
/// A video whose captions are disabled.
pub const NO_CAPTIONS: &str = "https://www.youtube.com/watch?v=ccccccccccc";

/// Key the fake provider rejects.
pub const BAD_KEY: &str = "bad-key";
pub const GOOD_KEY: &str = "good-key";
/// Key for which the embeddings endpoint is unreachable.
pub const DOWN_KEY: &str = "down-key";

/// Serves canned transcripts; unknown videos have captions disabled.
pub struct FakeFetcher {
    transcripts: HashMap<String, Vec<&'static str>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        let mut transcripts = HashMap::new();
        transcripts.insert(
            "aaaaaaaaaaa".to_string(),
            vec!["alpha talks about volcanoes", "lava flows are hot"],
        );
        transcripts.insert(
            "bbbbbbbbbbb".to_string(),
            vec!["beta explains sourdough", "bread needs starter"],
        );
        Self { transcripts }
    }
}

#[async_trait]
impl TranscriptFetcher for FakeFetcher {
    async fn fetch(&self, video: &VideoRef) -> Result<Transcript> {
        let lines = self.transcripts.get(&video.video_id).ok_or_else(|| {
            TubechatError::TranscriptUnavailable("Subtitles are disabled for this video".into())
        })?;
        let segments = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                TranscriptSegment::new(i as f64 * 40.0, (i + 1) as f64 * 40.0, text.to_string())
            })
            .collect();
        Ok(Transcript::new(video.video_id.clone(), segments).with_language("en"))
    }
}

/// Bag-of-words hashing embedder.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 32];
        for word in text.to_lowercase().split_whitespace() {
            let slot = word.bytes().map(|b| b as usize).sum::<usize>() % 32;
            v[slot] += 1.0;
        }
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(32)
    }
}

/// Embedder whose provider rejects the key.
pub struct RejectingEmbedder;

#[async_trait]
impl Embedder for RejectingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(TubechatError::Authentication("API key not valid".into()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(TubechatError::Authentication("API key not valid".into()))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// Embedder whose endpoint keeps failing.
pub struct UnavailableEmbedder;

#[async_trait]
impl Embedder for UnavailableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(TubechatError::Embedding("upstream 503".into()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(TubechatError::Embedding("upstream 503".into()))
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// Replies with the final prompt so tests can see which context was used.
pub struct EchoGenerator {
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TubechatError::Generation("upstream timed out".into()));
        }
        Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
    }
}

pub struct FakeProvider {
    pub fail_generation: Arc<AtomicBool>,
}

impl ModelProvider for FakeProvider {
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn Embedder>> {
        match api_key {
            BAD_KEY => Ok(Arc::new(RejectingEmbedder)),
            DOWN_KEY => Ok(Arc::new(UnavailableEmbedder)),
            _ => Ok(Arc::new(HashEmbedder)),
        }
    }

    fn generator(&self, _api_key: &str) -> Result<Arc<dyn Generator>> {
        Ok(Arc::new(EchoGenerator {
            fail: self.fail_generation.clone(),
        }))
    }
}

/// An orchestrator wired to fakes, with its temp directory.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub fail_generation: Arc<AtomicBool>,
    pub temp: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let temp = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.general.temp_dir = temp.path().to_string_lossy().into_owned();
    settings.vector_store.provider = VectorStoreProvider::Sqlite;
    settings.rag.min_score = -1.0;
    settings.rag.max_context_chunks = 10;

    let fail_generation = Arc::new(AtomicBool::new(false));
    let orchestrator = Orchestrator::with_components(
        settings,
        Prompts::default(),
        Arc::new(FakeFetcher::new()),
        Arc::new(FakeProvider {
            fail_generation: fail_generation.clone(),
        }),
    )
    .unwrap();

    Harness {
        orchestrator,
        fail_generation,
        temp,
    }
}
