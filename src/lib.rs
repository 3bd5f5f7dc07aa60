//! Tubechat - Chat with a YouTube video
//!
//! Paste a video link, and Tubechat fetches its transcript, indexes it for
//! retrieval, and answers questions about it with an LLM.
//!
//! # Overview
//!
//! Each browser tab gets a session holding:
//! - The user's API key (never logged or echoed back)
//! - The loaded video and an index private to the session
//! - The chat history, append-only and reset when a new video is loaded
//!
//! Indexes live in temporary directories that are removed when the session
//! ends, whether explicitly, by idle expiry, or on server shutdown.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `video_source` - URL parsing and transcript retrieval
//! - `transcript` - Timestamped transcript model
//! - `chunking` - Time-window chunking of transcripts
//! - `embedding` - Embedding generation
//! - `vector_store` - Per-session vector index
//! - `rag` - Retrieval and answer generation
//! - `session` - Session state, history and lifecycle
//! - `orchestrator` - Pipeline coordination
//! - `web` - HTTP server and chat page
//!
//! # Example
//!
//! ```rust,no_run
//! use tubechat::config::Settings;
//! use tubechat::orchestrator::Orchestrator;
//! use tubechat::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Settings::load()?)?;
//!
//!     let mut session = Session::new();
//!     session.set_api_key("sk-...")?;
//!     orchestrator
//!         .load_video(&mut session, "https://youtu.be/dQw4w9WgXcQ")
//!         .await?;
//!
//!     let reply = orchestrator.chat(&mut session, "What is this about?").await?;
//!     println!("{}", reply.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod session;
pub mod transcript;
pub mod vector_store;
pub mod video_source;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, TubechatError};
