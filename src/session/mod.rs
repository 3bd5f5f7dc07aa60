//! Per-browser-session state.
//!
//! A session owns the user's API key, the currently loaded video, its
//! ephemeral vector index, and the chat history. Nothing here outlives the
//! session: ending it tears the index down.

mod history;
mod manager;

pub use history::{ChatHistory, ChatMessage, Role};
pub use manager::{SessionHandle, SessionManager};

use crate::error::{Result, TubechatError};
use crate::vector_store::{EphemeralIndex, VectorStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No video indexed yet.
    Uninitialized,
    /// A video is indexed and the conversation is empty.
    VideoLoaded,
    /// At least one question has been answered.
    Chatting,
}

/// The video a session is currently chatting about.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedVideo {
    pub video_id: String,
    pub url: String,
    pub title: String,
    pub language: Option<String>,
    pub chunk_count: usize,
    pub duration_seconds: f64,
    pub loaded_at: DateTime<Utc>,
}

/// Serializable view of a session, without secrets.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub has_api_key: bool,
    pub api_key_rejected: bool,
    pub video: Option<LoadedVideo>,
    pub messages: ChatHistory,
    pub created_at: DateTime<Utc>,
}

/// One user's interactive session.
pub struct Session {
    id: Uuid,
    api_key: Option<String>,
    key_rejected: bool,
    video: Option<LoadedVideo>,
    index: Option<EphemeralIndex>,
    history: ChatHistory,
    created_at: DateTime<Utc>,
    last_active: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("has_api_key", &self.api_key.is_some())
            .field("video", &self.video.as_ref().map(|v| &v.video_id))
            .field("messages", &self.history.len())
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            api_key: None,
            key_rejected: false,
            video: None,
            index: None,
            history: ChatHistory::new(),
            created_at: Utc::now(),
            last_active: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        match (&self.video, self.history.is_empty()) {
            (None, _) => SessionState::Uninitialized,
            (Some(_), true) => SessionState::VideoLoaded,
            (Some(_), false) => SessionState::Chatting,
        }
    }

    pub fn video(&self) -> Option<&LoadedVideo> {
        self.video.as_ref()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Store the user's API key. A new key clears a previous rejection.
    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(TubechatError::InvalidInput(
                "API key must not be empty".to_string(),
            ));
        }
        if self.api_key.as_deref() != Some(api_key) {
            self.api_key = Some(api_key.to_string());
            self.key_rejected = false;
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The usable API key, or `Authentication` when it is missing or was rejected.
    pub fn api_key(&self) -> Result<&str> {
        match (&self.api_key, self.key_rejected) {
            (None, _) => Err(TubechatError::Authentication(
                "Please enter an API key first".to_string(),
            )),
            (Some(_), true) => Err(TubechatError::Authentication(
                "The API key was rejected by the provider; enter a valid key to continue"
                    .to_string(),
            )),
            (Some(key), false) => Ok(key),
        }
    }

    /// Disable upstream calls until a different key is set.
    pub fn mark_key_rejected(&mut self) {
        self.key_rejected = true;
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// Handle to the active index, if a video is loaded.
    pub fn index_store(&self) -> Option<Arc<dyn VectorStore>> {
        self.index.as_ref().map(|i| i.store())
    }

    /// On-disk location of the active index.
    pub fn index_path(&self) -> Option<std::path::PathBuf> {
        self.index.as_ref().and_then(|i| i.path()).map(|p| p.to_path_buf())
    }

    /// Drop the current video, its index and the conversation.
    pub(crate) async fn discard_video(&mut self) {
        if let Some(index) = self.index.take() {
            if let Err(e) = index.teardown().await {
                warn!("Failed to remove index for session {}: {}", self.id, e);
            }
        }
        if let Some(video) = self.video.take() {
            info!("Session {} discarded video {}", self.id, video.video_id);
        }
        self.history.reset();
    }

    /// Make a freshly built index the active one.
    pub(crate) fn install_video(&mut self, video: LoadedVideo, index: EphemeralIndex) {
        debug_assert!(self.index.is_none(), "previous index must be torn down first");
        self.video = Some(video);
        self.index = Some(index);
        self.history.reset();
    }

    pub(crate) fn record_turn(&mut self, question: &str, answer: &str) {
        self.history.push_turn(question, answer);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state(),
            has_api_key: self.api_key.is_some(),
            api_key_rejected: self.key_rejected,
            video: self.video.clone(),
            messages: self.history.clone(),
            created_at: self.created_at,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
