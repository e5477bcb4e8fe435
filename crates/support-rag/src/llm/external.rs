//! External API providers
//! Supports OpenAI, Anthropic, and OpenAI-compatible custom endpoints.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ChatMessage, ChatRole, GenerationParams, LlmCompletion, LlmProvider};
use crate::config::{ModelConfig, ProviderKind};
use crate::error::EngineError;

#[derive(Debug)]
pub struct ExternalProvider {
    kind: ProviderKind,
    api_key: String,
    client: Client,
}

impl ExternalProvider {
    /// Build the provider selected by the model configuration. Called once
    /// at engine construction; a missing key or broken client is a
    /// configuration error, not a per-turn failure.
    pub fn from_config(model: &ModelConfig) -> Result<Self, EngineError> {
        if model.api_key.is_empty() && !matches!(model.provider, ProviderKind::Custom { .. }) {
            return Err(EngineError::Configuration(
                "model.api_key must be set for hosted providers".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(model.timeout_secs.max(30)))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| EngineError::Configuration(format!("http client build failed: {}", e)))?;

        Ok(Self {
            kind: model.provider.clone(),
            api_key: model.api_key.clone(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        match &self.kind {
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
            ProviderKind::Custom { endpoint } => endpoint.clone(),
        }
    }

    /// Parse a response body as JSON, returning a clear error if the server
    /// returned HTML.
    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body from {}: {}", endpoint, e))?;
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') || trimmed.starts_with("<!") {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(anyhow!(
                "Endpoint {} returned HTML instead of JSON (HTTP {}) - service may be down. Response: {}",
                endpoint,
                status,
                preview
            ));
        }
        serde_json::from_str::<T>(&body).map_err(|e| {
            let preview: String = body.chars().take(300).collect();
            anyhow!(
                "Failed to parse JSON from {} (HTTP {}): {}. Body: {}",
                endpoint,
                status,
                e,
                preview
            )
        })
    }

    async fn openai_compatible_generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<LlmCompletion> {
        let endpoint = self.endpoint();
        let request = json!({
            "model": params.model,
            "messages": messages.iter().map(|m| json!({
                "role": role_str(m.role),
                "content": m.content,
            })).collect::<Vec<_>>(),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": false
        });

        let mut builder = self.client.post(&endpoint).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow!("Request to {} timed out - check network connectivity", endpoint)
            } else if e.is_connect() {
                anyhow!(
                    "Failed to connect to {} - check network/firewall/proxy: {}",
                    endpoint,
                    e
                )
            } else {
                anyhow!("Request to {} failed: {}", endpoint, e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(anyhow!("API error ({}): {}", status, error));
        }

        let result: OpenAiResponse = Self::parse_json_response(response, &endpoint).await?;
        let text = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("OpenAI returned empty choices array"))?;

        // total_tokens when present, otherwise sum the halves.
        let tokens_used = result
            .usage
            .as_ref()
            .map(|u| {
                u.total_tokens
                    .unwrap_or(u.prompt_tokens.unwrap_or(0) + u.completion_tokens.unwrap_or(0))
            })
            .unwrap_or(0);

        Ok(LlmCompletion { text, tokens_used })
    }

    async fn anthropic_generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<LlmCompletion> {
        let endpoint = self.endpoint();

        // Anthropic takes system text as a top-level field, not a message role.
        let system_text = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let chat: Vec<_> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                json!({
                    "role": role_str(m.role),
                    "content": m.content,
                })
            })
            .collect();

        let mut request = json!({
            "model": params.model,
            "messages": chat,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });
        if !system_text.is_empty() {
            request["system"] = json!(system_text);
        }

        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Request to {} timed out - check network connectivity", endpoint)
                } else {
                    anyhow!("Request to {} failed: {}", endpoint, e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            return Err(anyhow!("Anthropic API error ({}): {}", status, error));
        }

        let result: AnthropicResponse = Self::parse_json_response(response, &endpoint).await?;
        let text = result
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| anyhow!("Anthropic returned empty content array"))?;

        let tokens_used = result
            .usage
            .as_ref()
            .map(|u| u.input_tokens.unwrap_or(0) + u.output_tokens.unwrap_or(0))
            .unwrap_or(0);

        Ok(LlmCompletion { text, tokens_used })
    }
}

#[async_trait]
impl LlmProvider for ExternalProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<LlmCompletion> {
        match &self.kind {
            ProviderKind::OpenAi | ProviderKind::Custom { .. } => {
                self.openai_compatible_generate(messages, params).await
            }
            ProviderKind::Anthropic => self.anthropic_generate(messages, params).await,
        }
    }

    fn name(&self) -> &str {
        match &self.kind {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Custom { .. } => "custom",
        }
    }
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// Response structures
#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}
