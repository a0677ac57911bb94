//! Language model access.
//!
//! The [`LanguageModel`] trait is the seam between the task handler and
//! the model backend. [`OllamaModel`] drives an Ollama-compatible
//! `/api/chat` endpoint with function calling: it keeps asking the model
//! until a reply arrives with no tool calls.

use crate::agent::tools::{ToolDefinition, ToolRegistry};
use crate::config::ModelConfig;
use crate::error::{ConfigError, GenerationError, TransportError};
use crate::models::{ModelMessage, ModelRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Produces a final text answer for a conversation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate the reply to `messages`, calling `tools` as the model asks.
    async fn generate(
        &self,
        preamble: &str,
        messages: &[ModelMessage],
        tools: &ToolRegistry,
    ) -> Result<String, GenerationError>;
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallMessage>>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

impl From<&ModelMessage> for ChatMessage {
    fn from(message: &ModelMessage) -> Self {
        let role = match message.role {
            ModelRole::User => "user",
            ModelRole::Model => "assistant",
        };
        ChatMessage::new(role, message.joined_text())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallFunction {
    /// Arguments as an object. Some models send them as a JSON string.
    fn input(&self) -> Value {
        match &self.arguments {
            Value::String(raw) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            }
            other => other.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallMessage>>,
}

/// Ollama chat client with a bounded tool-calling loop.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    http_client: reqwest::Client,
    config: ModelConfig,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ConfigError> {
        if config.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "model.max_iterations must be at least 1".to_string(),
            ));
        }

        if !config.ollama_url.starts_with("http://") && !config.ollama_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "model.ollama_url must start with 'http://' or 'https://': {}",
                config.ollama_url
            )));
        }

        info!("Using model {} at {}", config.name, config.ollama_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    /// One `/api/chat` round trip.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &ToolRegistry,
    ) -> Result<ResponseMessage, GenerationError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: &self.config.name,
            messages,
            tools: tools.definitions(),
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request with {} messages", messages.len());

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Model(format!(
                    "Request timed out after {}s. Try a different model.",
                    self.config.timeout_seconds
                ))
            } else if e.is_connect() {
                GenerationError::Model(format!(
                    "Cannot connect to Ollama at {}. Is Ollama running?",
                    self.config.ollama_url
                ))
            } else {
                GenerationError::Transport(TransportError::Http(e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(chat_response.message)
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn generate(
        &self,
        preamble: &str,
        messages: &[ModelMessage],
        tools: &ToolRegistry,
    ) -> Result<String, GenerationError> {
        let mut history = Vec::with_capacity(messages.len() + 1);
        history.push(ChatMessage::new("system", preamble));
        history.extend(messages.iter().map(ChatMessage::from));

        for iteration in 0..self.config.max_iterations {
            debug!("Model round {}", iteration + 1);

            let reply = self.chat(&history, tools).await?;
            let calls = reply.tool_calls.clone().unwrap_or_default();

            history.push(ChatMessage {
                role: "assistant".to_string(),
                content: reply.content.clone(),
                tool_calls: reply.tool_calls,
            });

            if calls.is_empty() {
                return Ok(reply.content);
            }

            for call in calls {
                let name = &call.function.name;
                let content = match tools.invoke(name, call.function.input()).await {
                    Ok(output) => output.to_string(),
                    Err(e) if e.is_recoverable() => {
                        warn!("Returning tool error to model: {}", e);
                        format!("Error: {}", e)
                    }
                    Err(e) => return Err(e.into()),
                };
                info!("Tool {} executed", name);
                history.push(ChatMessage::new("tool", content));
            }
        }

        Err(GenerationError::IterationLimit(self.config.max_iterations))
    }
}
