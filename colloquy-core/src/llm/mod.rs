//! Completion backend contract
//!
//! Colloquy never talks to a model API directly. Hosts plug in a
//! [`CompletionBackend`] (OpenAI, Anthropic, a local server, a test double)
//! and the conversation manager calls it once per turn, plus once per
//! summarizing compression.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{Message, MessageRole};
use crate::error::BackendError;

/// A role/content pair as sent to a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request to a completion backend
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Conversation history, oldest first
    pub messages: Vec<ChatMessage>,

    /// System prompt to prepend, if the agent has one
    pub system_prompt: Option<String>,

    /// Model override; `None` lets the backend pick its default
    pub model: Option<String>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl CompletionRequest {
    /// Create a request over a message history with default sampling settings
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            system_prompt: None,
            model: None,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Response from a completion backend
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage information, when the backend reports it
    pub usage: Option<TokenUsage>,

    /// Identifier of the model that produced the response
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for completion backend implementations.
///
/// Implementations own transport, authentication, timeouts and retries.
/// A returned [`BackendError`] should say whether the failure is transient.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate the next assistant message for `request`
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, BackendError>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Backend that always fails.
///
/// Useful where no model is configured: turns fail with a non-retryable
/// error and summarizing compression falls back to truncation.
pub struct StubBackend;

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, BackendError> {
        Err(BackendError::fatal(
            "Completion backend not configured. Implement the CompletionBackend trait for your provider",
        ))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "stub".to_string(),
            model_name: "none".to_string(),
        }
    }
}
