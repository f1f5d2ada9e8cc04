//! Context Tracker Configuration

use serde::{Deserialize, Serialize};

/// Thresholds that decide when a conversation must be compressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Context window of the backend, in tokens
    pub max_context_tokens: usize,

    /// Message count at which compression becomes due
    pub max_message_threshold: usize,

    /// Window usage (0-100) at which compression becomes due
    pub max_token_percentage: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 128_000,
            max_message_threshold: 50,
            max_token_percentage: 80.0,
        }
    }
}

impl ContextConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context window size
    pub fn with_max_context_tokens(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    /// Set the message count threshold
    pub fn with_max_message_threshold(mut self, count: usize) -> Self {
        self.max_message_threshold = count.max(1);
        self
    }

    /// Set the window usage threshold
    pub fn with_max_token_percentage(mut self, percentage: f64) -> Self {
        self.max_token_percentage = percentage.clamp(1.0, 100.0);
        self
    }
}
