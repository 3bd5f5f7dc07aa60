//! Error types for Tubechat.

use thiserror::Error;

/// Library-level error type for Tubechat operations.
#[derive(Error, Debug)]
pub enum TubechatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TubechatError {
    /// Stable snake_case name of the error kind, used by the HTTP API.
    pub fn kind(&self) -> &'static str {
        match self {
            TubechatError::InvalidInput(_) => "invalid_input",
            TubechatError::TranscriptUnavailable(_) => "transcript_unavailable",
            TubechatError::Authentication(_) => "authentication_error",
            TubechatError::Generation(_) => "generation_error",
            TubechatError::SessionNotFound(_) => "session_not_found",
            TubechatError::Config(_) => "config_error",
            TubechatError::Embedding(_) => "embedding_error",
            TubechatError::VectorStore(_) | TubechatError::Database(_) => "vector_store_error",
            TubechatError::Io(_) => "io_error",
            TubechatError::Json(_) | TubechatError::TomlParse(_) => "parse_error",
            TubechatError::Http(_) => "http_error",
        }
    }

    /// Whether this error means the provider rejected the API key.
    pub fn is_authentication(&self) -> bool {
        matches!(self, TubechatError::Authentication(_))
    }
}

/// Result type alias for Tubechat operations.
pub type Result<T> = std::result::Result<T, TubechatError>;
