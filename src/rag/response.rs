//! RAG response generation.

use super::context::format_context_for_prompt;
use super::{ContextBuilder, ContextChunk, Generator, PromptMessage, PromptRole};
use crate::config::{Prompts, RagSettings};
use crate::embedding::Embedder;
use crate::error::{Result, TubechatError};
use crate::session::{ChatHistory, Role};
use crate::vector_store::VectorStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const NO_CONTEXT: &str = "(No relevant excerpts were found in the transcript.)";

/// RAG engine answering questions about one indexed video.
pub struct RagEngine {
    generator: Arc<dyn Generator>,
    context_builder: ContextBuilder,
    prompts: Prompts,
    video_title: String,
    history_messages: usize,
}

impl RagEngine {
    /// Create a new RAG engine over a session's index.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: &RagSettings,
    ) -> Self {
        let context_builder = ContextBuilder::new(vector_store, embedder)
            .with_max_chunks(settings.max_context_chunks)
            .with_min_score(settings.min_score);

        Self {
            generator,
            context_builder,
            prompts: Prompts::default(),
            video_title: String::new(),
            history_messages: settings.history_messages,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Title of the video, made available to prompts as `{{title}}`.
    pub fn with_video_title(mut self, title: &str) -> Self {
        self.video_title = title.to_string();
        self
    }

    /// Answer a question, taking the earlier conversation into account.
    ///
    /// Any failure is `Authentication` (key rejected) or `Generation`.
    #[instrument(skip(self, history), fields(history = history.len()))]
    pub async fn answer(&self, question: &str, history: &ChatHistory) -> Result<RagResponse> {
        info!("Answering question: {}", question);

        let sources = self.context_builder.build(question).await.map_err(|e| match e {
            TubechatError::Authentication(_) => e,
            other => TubechatError::Generation(format!("Retrieval failed: {}", other)),
        })?;

        let messages = self.build_messages(question, &sources, history);
        let answer = self.generator.generate(&messages).await?;

        debug!("Generated response with {} sources", sources.len());

        Ok(RagResponse { answer, sources })
    }

    /// System prompt, recent history, then the question with its context.
    ///
    /// The history window holds whole question/answer pairs only.
    fn build_messages(
        &self,
        question: &str,
        sources: &[ContextChunk],
        history: &ChatHistory,
    ) -> Vec<PromptMessage> {
        let context = if sources.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            format_context_for_prompt(sources)
        };

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);
        vars.insert("title".to_string(), self.video_title.clone());

        let system = self.prompts.render_with_custom(&self.prompts.rag.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);

        let recent = history.recent(self.history_messages - self.history_messages % 2);
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(PromptMessage::new(PromptRole::System, system));
        messages.extend(recent.iter().map(|m| {
            let role = match m.role {
                Role::User => PromptRole::User,
                Role::Assistant => PromptRole::Assistant,
            };
            PromptMessage::new(role, m.content.clone())
        }));
        messages.push(PromptMessage::new(PromptRole::User, user));
        messages
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Document, MemoryVectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds text as a one-hot vector keyed on a keyword.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(if text.contains("rust") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> Option<usize> {
            Some(2)
        }
    }

    /// Records the prompt it was given and replies with a fixed answer.
    #[derive(Default)]
    struct RecordingGenerator {
        seen: Mutex<Vec<PromptMessage>>,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, messages: &[PromptMessage]) -> Result<String> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok("It is about rust.".to_string())
        }
    }

    async fn store_with_docs() -> Arc<dyn VectorStore> {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                Document::new(
                    "vid".into(),
                    "T".into(),
                    "talking about rust".into(),
                    0.0,
                    30.0,
                    vec![1.0, 0.0],
                    0,
                ),
                Document::new(
                    "vid".into(),
                    "T".into(),
                    "cooking pasta".into(),
                    30.0,
                    60.0,
                    vec![0.0, 1.0],
                    1,
                ),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    fn engine(
        generator: Arc<RecordingGenerator>,
        store: Arc<dyn VectorStore>,
        history: usize,
    ) -> RagEngine {
        let settings = RagSettings {
            max_context_chunks: 1,
            min_score: 0.5,
            history_messages: history,
        };
        RagEngine::new(store, Arc::new(KeywordEmbedder), generator, &settings)
            .with_video_title("Video (ID: vid)")
    }

    fn two_turns() -> ChatHistory {
        let mut history = ChatHistory::new();
        history.push_turn("old question", "old answer");
        history.push_turn("previous question", "previous answer");
        history
    }

    #[tokio::test]
    async fn test_answer_uses_context_and_history() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = engine(generator.clone(), store_with_docs().await, 2);

        let response = engine.answer("what about rust?", &two_turns()).await.unwrap();
        assert_eq!(response.answer, "It is about rust.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].content, "talking about rust");

        let seen = generator.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].role, PromptRole::System);
        assert_eq!(seen[1].content, "previous question");
        assert_eq!(seen[2].role, PromptRole::Assistant);
        assert!(seen[3].content.contains("talking about rust"));
        assert!(seen[3].content.contains("Video (ID: vid)"));
        assert!(!seen[3].content.contains("cooking pasta"));
    }

    #[tokio::test]
    async fn test_odd_history_window_keeps_whole_turns() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = engine(generator.clone(), store_with_docs().await, 3);

        engine.answer("rust again", &two_turns()).await.unwrap();

        let seen = generator.seen.lock().unwrap().clone();
        let roles: Vec<_> = seen.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                PromptRole::System,
                PromptRole::User,
                PromptRole::Assistant,
                PromptRole::User
            ]
        );
        assert_eq!(seen[1].content, "previous question");
    }

    #[tokio::test]
    async fn test_question_placeholders_reach_model_verbatim() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = engine(generator.clone(), store_with_docs().await, 2);

        engine
            .answer("in rust, what does {{context}} mean?", &ChatHistory::new())
            .await
            .unwrap();

        let seen = generator.seen.lock().unwrap().clone();
        let prompt = &seen.last().unwrap().content;
        assert!(prompt.contains("Question: in rust, what does {{context}} mean?"));
        assert_eq!(prompt.matches("talking about rust").count(), 1);
    }

    #[tokio::test]
    async fn test_answer_without_matching_context() {
        let generator = Arc::new(RecordingGenerator::default());
        let engine = RagEngine::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(KeywordEmbedder),
            generator.clone(),
            &RagSettings::default(),
        );

        let response = engine.answer("anything", &ChatHistory::new()).await.unwrap();
        assert!(response.sources.is_empty());
        let seen = generator.seen.lock().unwrap().clone();
        assert!(seen.last().unwrap().content.contains(NO_CONTEXT));
    }
}
