//! Language-model provider layer.
//!
//! One closed set of provider variants behind a single `generate()` contract.
//! Whatever shape the native API returns, the output is normalized to
//! `LlmCompletion { text, tokens_used }` with a single integer token count.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod external;

pub use external::ExternalProvider;

use crate::config::ModelConfig;
use crate::context::AssembledContext;
use crate::error::EngineError;
use crate::types::GeneratedResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters passed through to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Provider output in a normalized shape, regardless of native format.
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub text: String,
    pub tokens_used: u32,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<LlmCompletion>;

    fn name(&self) -> &str;
}

/// Builds the provider request from an assembled context and invokes the
/// configured model. Provider errors are not retried here — the caller owns
/// the retry/escalate decision.
pub struct ResponseGenerator {
    provider: Arc<dyn LlmProvider>,
    model: ModelConfig,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: ModelConfig) -> Self {
        Self { provider, model }
    }

    /// Message order: system prompt, knowledge context (if any), history,
    /// then the current user message.
    pub fn build_messages(&self, context: &AssembledContext) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(context.history.len() + 3);

        if !self.model.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.model.system_prompt.clone()));
        }
        if !context.knowledge_context.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Relevant knowledge base articles:\n\n{}",
                context.knowledge_context
            )));
        }
        messages.extend(context.history.iter().cloned());
        messages.push(ChatMessage::user(context.current_message.clone()));
        messages
    }

    pub async fn generate(
        &self,
        context: &AssembledContext,
    ) -> Result<GeneratedResponse, EngineError> {
        let messages = self.build_messages(context);
        let params = GenerationParams {
            model: self.model.model_name.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
        };

        let completion = tokio::time::timeout(
            Duration::from_secs(self.model.timeout_secs),
            self.provider.generate(&messages, &params),
        )
        .await
        .map_err(|_| {
            EngineError::Generation(anyhow!(
                "{} generation timed out after {}s",
                self.provider.name(),
                self.model.timeout_secs
            ))
        })?
        .map_err(EngineError::Generation)?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.model.model_name,
            tokens = completion.tokens_used,
            "generation complete"
        );

        Ok(GeneratedResponse {
            text: completion.text,
            tokens_used: completion.tokens_used,
            model_used: self.model.model_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextAssembler;
    use crate::types::{Message, MessageRole, RetrievedChunk, SourceType};
    use std::collections::HashMap;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<LlmCompletion> {
            Ok(LlmCompletion {
                text: messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                tokens_used: 42,
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<LlmCompletion> {
            Err(anyhow!("rate limited"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn assembled() -> AssembledContext {
        let assembler = ContextAssembler::new(20, 8000);
        let history = vec![
            Message::new("s1", MessageRole::User, "do you ship to Norway?"),
            Message::new("s1", MessageRole::Assistant, "Yes, we ship worldwide."),
        ];
        let chunks = vec![RetrievedChunk {
            source_id: "kb-1".to_string(),
            source_type: SourceType::Document,
            text: "Shipping takes 3-5 business days.".to_string(),
            similarity: 0.9,
            metadata: HashMap::new(),
        }];
        assembler.assemble(&history, &chunks, "how long does it take?", "shipping duration")
    }

    #[test]
    fn test_message_order() {
        let generator = ResponseGenerator::new(Arc::new(EchoProvider), ModelConfig::default());
        let messages = generator.build_messages(&assembled());

        // system prompt, knowledge context, 2 history turns, current message
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::System);
        assert!(messages[1].content.contains("Shipping takes"));
        assert_eq!(messages[2].role, ChatRole::User);
        assert_eq!(messages[3].role, ChatRole::Assistant);
        assert_eq!(messages[4].role, ChatRole::User);
        assert_eq!(messages[4].content, "how long does it take?");
    }

    #[test]
    fn test_knowledge_context_omitted_when_empty() {
        let generator = ResponseGenerator::new(Arc::new(EchoProvider), ModelConfig::default());
        let assembler = ContextAssembler::new(20, 8000);
        let context = assembler.assemble(&[], &[], "hello", "hello");
        let messages = generator.build_messages(&context);
        assert_eq!(messages.len(), 2); // system prompt + current message only
    }

    #[tokio::test]
    async fn test_generate_normalizes_output() {
        let generator = ResponseGenerator::new(Arc::new(EchoProvider), ModelConfig::default());
        let response = generator.generate(&assembled()).await.unwrap();
        assert_eq!(response.text, "how long does it take?");
        assert_eq!(response.tokens_used, 42);
        assert_eq!(response.model_used, ModelConfig::default().model_name);
    }

    #[tokio::test]
    async fn test_provider_error_is_generation_failure() {
        let generator = ResponseGenerator::new(Arc::new(FailingProvider), ModelConfig::default());
        let err = generator.generate(&assembled()).await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
        assert!(!err.is_recoverable());
    }
}
