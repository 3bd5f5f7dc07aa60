//! OpenAI-compatible client construction and error mapping.

use crate::config::{EmbeddingSettings, LlmSettings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TubechatError};
use crate::rag::{Generator, ModelProvider, OpenAIGenerator};
use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use std::sync::Arc;
use std::time::Duration;

/// Create a client for the given API key, honoring the configured base URL and timeout.
pub fn create_client(api_key: &str, settings: &LlmSettings) -> Result<Client<OpenAIConfig>> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(TubechatError::Authentication(
            "No API key provided".to_string(),
        ));
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = settings.api_base.as_deref().filter(|b| !b.trim().is_empty()) {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Map an API error to `Authentication` when the provider rejected the key,
/// or to `fallback` otherwise.
///
/// Rejections arrive as an error body; bodies that fail to parse carry no
/// text to inspect and go to `fallback`.
pub fn classify_error(err: OpenAIError, fallback: fn(String) -> TubechatError) -> TubechatError {
    if let OpenAIError::ApiError(api) = &err {
        let kind = api.r#type.as_deref().unwrap_or_default();
        if is_auth_message(&api.message) || is_auth_message(kind) {
            return TubechatError::Authentication(api.message.clone());
        }
    }
    fallback(err.to_string())
}

fn is_auth_message(text: &str) -> bool {
    let text = text.to_lowercase();
    ["api key", "api_key", "unauthorized", "authentication", "permission denied"]
        .iter()
        .any(|needle| text.contains(needle))
}

/// Builds OpenAI-backed embedders and generators for a user's API key.
pub struct OpenAIProvider {
    llm: LlmSettings,
    embedding: EmbeddingSettings,
}

impl OpenAIProvider {
    pub fn new(llm: LlmSettings, embedding: EmbeddingSettings) -> Self {
        Self { llm, embedding }
    }
}

impl ModelProvider for OpenAIProvider {
    fn embedder(&self, api_key: &str) -> Result<Arc<dyn Embedder>> {
        let client = create_client(api_key, &self.llm)?;
        Ok(Arc::new(OpenAIEmbedder::new(
            client,
            &self.embedding.model,
            self.embedding.dimensions,
        )))
    }

    fn generator(&self, api_key: &str) -> Result<Arc<dyn Generator>> {
        let client = create_client(api_key, &self.llm)?;
        Ok(Arc::new(OpenAIGenerator::new(client, &self.llm)))
    }
}
