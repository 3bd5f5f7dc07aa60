//! Pipeline orchestrator for Tubechat.
//!
//! Coordinates loading a video (transcript → chunks → embeddings → session
//! index) and answering chat messages against the loaded video.

use crate::chunking::{ChunkingConfig, TemporalChunker};
use crate::config::{Prompts, Settings};
use crate::error::{Result, TubechatError};
use crate::openai::OpenAIProvider;
use crate::rag::{ModelProvider, RagEngine, RagResponse};
use crate::session::{LoadedVideo, Session};
use crate::vector_store::{Document, EphemeralIndex};
use crate::video_source::{parse_video_url, TranscriptFetcher, YoutubeTranscriptFetcher};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a "Load Video" action.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    /// The video now active in the session.
    pub video: LoadedVideo,
    /// True when the URL was already loaded and nothing was rebuilt.
    pub already_loaded: bool,
}

/// The main orchestrator for the Tubechat pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    fetcher: Arc<dyn TranscriptFetcher>,
    provider: Arc<dyn ModelProvider>,
    chunker: TemporalChunker,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator with the YouTube fetcher and OpenAI-compatible models.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let fetcher = Arc::new(YoutubeTranscriptFetcher::with_settings(&settings.youtube));
        let provider = Arc::new(OpenAIProvider::new(
            settings.llm.clone(),
            settings.embedding.clone(),
        ));

        info!(
            "Using model {} with embeddings {}",
            settings.llm.model, settings.embedding.model
        );

        Self::with_components(settings, prompts, fetcher, provider)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        fetcher: Arc<dyn TranscriptFetcher>,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self> {
        settings.validate()?;
        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            settings,
            prompts,
            fetcher,
            provider,
            chunker: TemporalChunker::new(),
            temp_dir,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load a video into the session: fetch its transcript and build a fresh index.
    ///
    /// A malformed URL or a missing transcript leaves the session untouched.
    /// Once the transcript is in hand the previous video, index and chat
    /// history are discarded before the new index is built.
    #[instrument(skip(self, session), fields(session = %session.id()))]
    pub async fn load_video(&self, session: &mut Session, url: &str) -> Result<LoadOutcome> {
        session.touch();
        let video = parse_video_url(url)?;

        if let Some(current) = session.video() {
            if current.video_id == video.video_id {
                info!("Video {} is already loaded", video.video_id);
                return Ok(LoadOutcome {
                    video: current.clone(),
                    already_loaded: true,
                });
            }
        }

        let embedder = self.provider.embedder(session.api_key()?)?;

        let transcript = self.fetcher.fetch(&video).await?;

        let chunks = self
            .chunker
            .chunk(&transcript, &ChunkingConfig::from(&self.settings.chunking));
        if chunks.is_empty() {
            return Err(TubechatError::TranscriptUnavailable(format!(
                "The transcript for video {} has no text",
                video.video_id
            )));
        }
        info!("Created {} chunks", chunks.len());

        session.discard_video().await;

        let index = EphemeralIndex::create(self.settings.vector_store.provider, &self.temp_dir)?;
        let title = video.display_title();

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = match embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Indexing {} failed: {}", video.video_id, e);
                if e.is_authentication() {
                    session.mark_key_rejected();
                    return Err(e);
                }
                return Err(TubechatError::Generation(format!("Indexing failed: {}", e)));
            }
        };

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Document::new(
                    video.video_id.clone(),
                    title.clone(),
                    chunk.content,
                    chunk.start_seconds,
                    chunk.end_seconds,
                    embedding,
                    chunk.order,
                )
            })
            .collect();

        let indexed = index.store().upsert_batch(&documents).await?;
        info!("Indexed {} chunks for {}", indexed, video.video_id);

        let loaded = LoadedVideo {
            video_id: video.video_id.clone(),
            url: video.url.clone(),
            title,
            language: transcript.language.clone(),
            chunk_count: indexed,
            duration_seconds: transcript.duration_seconds,
            loaded_at: Utc::now(),
        };
        session.install_video(loaded.clone(), index);

        Ok(LoadOutcome {
            video: loaded,
            already_loaded: false,
        })
    }

    /// Answer a chat message about the loaded video.
    ///
    /// Only a successful exchange is appended to the history.
    #[instrument(skip(self, session, message), fields(session = %session.id()))]
    pub async fn chat(&self, session: &mut Session, message: &str) -> Result<RagResponse> {
        session.touch();
        let message = message.trim();
        if message.is_empty() {
            return Err(TubechatError::InvalidInput(
                "Message must not be empty".to_string(),
            ));
        }

        let (store, title) = match (session.index_store(), session.video()) {
            (Some(store), Some(video)) => (store, video.title.clone()),
            _ => {
                return Err(TubechatError::InvalidInput(
                    "Load a video before asking questions".to_string(),
                ))
            }
        };

        let api_key = session.api_key()?;
        let embedder = self.provider.embedder(api_key)?;
        let generator = self.provider.generator(api_key)?;

        let engine = RagEngine::new(store, embedder, generator, &self.settings.rag)
            .with_prompts(self.prompts.clone())
            .with_video_title(&title);

        let result = engine.answer(message, session.history()).await;
        match result {
            Ok(response) => {
                session.record_turn(message, &response.answer);
                Ok(response)
            }
            Err(e) => {
                if e.is_authentication() {
                    session.mark_key_rejected();
                }
                warn!("Chat turn failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Role, SessionManager, SessionState};
    use crate::testing::{harness, BAD_KEY, DOWN_KEY, GOOD_KEY, NO_CAPTIONS, VIDEO_A, VIDEO_B};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn session_with_key() -> Session {
        let mut session = Session::new();
        session.set_api_key(GOOD_KEY).unwrap();
        session
    }

    #[tokio::test]
    async fn test_second_video_replaces_first() {
        let h = harness();
        let mut session = session_with_key();

        assert_ok!(h.orchestrator.load_video(&mut session, VIDEO_A).await);
        let first_index = session.index_path().unwrap();
        h.orchestrator.chat(&mut session, "tell me about lava").await.unwrap();

        let outcome = h.orchestrator.load_video(&mut session, VIDEO_B).await.unwrap();
        assert!(!outcome.already_loaded);
        assert_eq!(outcome.video.video_id, "bbbbbbbbbbb");
        assert_eq!(session.state(), SessionState::VideoLoaded);
        assert!(session.history().is_empty());
        assert!(!first_index.exists());

        let reply = h.orchestrator.chat(&mut session, "tell me about lava").await.unwrap();
        assert!(reply.answer.contains("sourdough"));
        assert!(!reply.answer.contains("volcanoes"));
        assert!(!reply.answer.contains("lava flows"));
        assert!(reply.sources.iter().all(|s| s.video_id == "bbbbbbbbbbb"));

        let store = session.index_store().unwrap();
        assert_eq!(store.document_count().await.unwrap(), outcome.video.chunk_count);
    }

    #[tokio::test]
    async fn test_malformed_url_has_no_side_effects() {
        let h = harness();
        let mut session = session_with_key();

        let err = h.orchestrator.load_video(&mut session, "not-a-url").await.unwrap_err();
        assert!(matches!(err, TubechatError::InvalidInput(_)));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.index_store().is_none());

        // Also with a video loaded and a conversation going
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        h.orchestrator.chat(&mut session, "volcanoes?").await.unwrap();
        assert_err!(h.orchestrator.load_video(&mut session, "https://vimeo.com/1").await);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.video().unwrap().video_id, "aaaaaaaaaaa");
    }

    #[tokio::test]
    async fn test_transcripts_disabled() {
        let h = harness();
        let mut session = session_with_key();

        let err = h.orchestrator.load_video(&mut session, NO_CAPTIONS).await.unwrap_err();
        assert!(matches!(err, TubechatError::TranscriptUnavailable(_)));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.index_store().is_none());

        // An active video survives a failed switch
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        h.orchestrator.chat(&mut session, "volcanoes?").await.unwrap();
        let index = session.index_path();

        let err = h.orchestrator.load_video(&mut session, NO_CAPTIONS).await.unwrap_err();
        assert!(matches!(err, TubechatError::TranscriptUnavailable(_)));
        assert_eq!(session.video().unwrap().video_id, "aaaaaaaaaaa");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.index_path(), index);
        assert!(index.unwrap().exists());
        assert_eq!(session.state(), SessionState::Chatting);
    }

    #[tokio::test]
    async fn test_upstream_failure_while_indexing() {
        let h = harness();
        let mut session = session_with_key();
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        let old_index = session.index_path().unwrap();

        session.set_api_key(DOWN_KEY).unwrap();
        let err = h.orchestrator.load_video(&mut session, VIDEO_B).await.unwrap_err();
        assert!(matches!(err, TubechatError::Generation(_)));
        assert_eq!(err.kind(), "generation_error");
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.index_store().is_none());
        assert!(!old_index.exists());
        // Not a key problem, so the key stays usable
        assert!(!session.snapshot().api_key_rejected);
    }

    #[tokio::test]
    async fn test_history_is_append_only_and_ordered() {
        let h = harness();
        let mut session = session_with_key();
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();

        let a = h.orchestrator.chat(&mut session, "A").await.unwrap();
        let b = h.orchestrator.chat(&mut session, "B").await.unwrap();
        assert_eq!(session.state(), SessionState::Chatting);

        let messages = session.history().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "A"));
        assert_eq!(messages[1].content, a.answer);
        assert_eq!((messages[2].role, messages[2].content.as_str()), (Role::User, "B"));
        assert_eq!(messages[3].content, b.answer);
    }

    #[tokio::test]
    async fn test_failed_generation_leaves_history_unchanged() {
        let h = harness();
        let mut session = session_with_key();
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        h.orchestrator.chat(&mut session, "first").await.unwrap();

        h.fail_generation.store(true, Ordering::SeqCst);
        let err = h.orchestrator.chat(&mut session, "second").await.unwrap_err();
        assert!(matches!(err, TubechatError::Generation(_)));
        assert_eq!(session.history().len(), 2);

        h.fail_generation.store(false, Ordering::SeqCst);
        h.orchestrator.chat(&mut session, "third").await.unwrap();
        let contents: Vec<_> = session
            .history()
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_chat_input_validation() {
        let h = harness();
        let mut session = session_with_key();

        let err = h.orchestrator.chat(&mut session, "hello").await.unwrap_err();
        assert!(matches!(err, TubechatError::InvalidInput(_)));

        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        let err = h.orchestrator.chat(&mut session, "   ").await.unwrap_err();
        assert!(matches!(err, TubechatError::InvalidInput(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_reloading_same_video_is_a_no_op() {
        let h = harness();
        let mut session = session_with_key();
        h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        h.orchestrator.chat(&mut session, "question").await.unwrap();
        let index = session.index_path();

        let outcome = h
            .orchestrator
            .load_video(&mut session, "https://youtu.be/aaaaaaaaaaa")
            .await
            .unwrap();
        assert!(outcome.already_loaded);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.index_path(), index);
    }

    #[tokio::test]
    async fn test_missing_key_is_authentication_error() {
        let h = harness();
        let mut session = Session::new();

        // URL validation comes first
        let err = h.orchestrator.load_video(&mut session, "").await.unwrap_err();
        assert!(matches!(err, TubechatError::InvalidInput(_)));

        let err = h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_rejected_key_disables_until_corrected() {
        let h = harness();
        let mut session = Session::new();
        session.set_api_key(BAD_KEY).unwrap();

        let err = h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.snapshot().api_key_rejected);

        session.set_api_key(GOOD_KEY).unwrap();
        assert_ok!(h.orchestrator.load_video(&mut session, VIDEO_A).await);
        assert_eq!(session.state(), SessionState::VideoLoaded);
    }

    #[tokio::test]
    async fn test_ended_session_leaves_no_index() {
        let h = harness();
        let manager = SessionManager::new(Duration::from_secs(60));

        let first = manager.create();
        let index_path = {
            let handle = manager.get(&first).unwrap();
            let mut session = handle.lock().await;
            session.set_api_key(GOOD_KEY).unwrap();
            h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
            h.orchestrator.chat(&mut session, "volcanoes").await.unwrap();
            session.index_path().unwrap()
        };
        assert!(index_path.exists());

        assert!(manager.end(&first).await);
        assert!(!index_path.exists());

        let second = manager.create();
        let handle = manager.get(&second).unwrap();
        let mut session = handle.lock().await;
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.index_store().is_none());
        assert!(session.history().is_empty());

        session.set_api_key(GOOD_KEY).unwrap();
        let outcome = h.orchestrator.load_video(&mut session, VIDEO_A).await.unwrap();
        assert!(!outcome.already_loaded);
        assert_ne!(session.index_path().unwrap(), index_path);
        let store = session.index_store().unwrap();
        assert_eq!(store.document_count().await.unwrap(), outcome.video.chunk_count);
    }
}
