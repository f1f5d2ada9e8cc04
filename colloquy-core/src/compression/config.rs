//! Compression Configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm used to shrink a conversation
///
/// Parsed leniently: any unrecognized name becomes [`Truncate`](Self::Truncate),
/// since dropping old messages is always preferable to failing mid-conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompressionStrategy {
    /// Replace older messages with a backend-generated summary
    #[default]
    Summarize,
    /// Keep system messages plus the most recent messages
    Truncate,
    /// Keep only the most recent messages
    SlidingWindow,
}

impl CompressionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionStrategy::Summarize => "summarize",
            CompressionStrategy::Truncate => "truncate",
            CompressionStrategy::SlidingWindow => "sliding_window",
        }
    }
}

impl fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CompressionStrategy {
    fn from(name: &str) -> Self {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "summarize" => CompressionStrategy::Summarize,
            "truncate" => CompressionStrategy::Truncate,
            "sliding_window" => CompressionStrategy::SlidingWindow,
            other => {
                tracing::warn!(strategy = other, "Unknown compression strategy, using truncate");
                CompressionStrategy::Truncate
            }
        }
    }
}

impl From<String> for CompressionStrategy {
    fn from(name: String) -> Self {
        CompressionStrategy::from(name.as_str())
    }
}

impl From<CompressionStrategy> for String {
    fn from(strategy: CompressionStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// Configuration for compression runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Algorithm to run
    pub strategy: CompressionStrategy,

    /// Desired token count after compression; bounds the summary length
    pub target_tokens: usize,

    /// Whether truncation keeps every system-role message
    pub preserve_system_messages: bool,

    /// Number of most recent messages that always survive
    pub preserve_recent_messages: usize,

    /// Replacement for the built-in summarization instruction
    pub summary_prompt: Option<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            strategy: CompressionStrategy::Summarize,
            target_tokens: 4000,
            preserve_system_messages: true,
            preserve_recent_messages: 10,
            summary_prompt: None,
        }
    }
}

impl CompressionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_target_tokens(mut self, tokens: usize) -> Self {
        self.target_tokens = tokens;
        self
    }

    pub fn with_preserve_system_messages(mut self, preserve: bool) -> Self {
        self.preserve_system_messages = preserve;
        self
    }

    pub fn with_preserve_recent_messages(mut self, count: usize) -> Self {
        self.preserve_recent_messages = count;
        self
    }

    pub fn with_summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.summary_prompt = Some(prompt.into());
        self
    }
}
