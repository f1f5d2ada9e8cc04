//! Conversation messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::llm::TokenUsage;

/// Metadata key marking a message as a compression summary
pub const SUMMARY_KEY: &str = "compression_summary";

/// Metadata key holding how many messages a summary replaced
pub const REPLACED_COUNT_KEY: &str = "replaced_messages";

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
///
/// Messages are immutable once appended; compression removes or replaces
/// them as whole units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Exact usage reported by the backend that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Free-form metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Message {
    /// Create a new message with a fresh ID
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            usage: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create the synthetic system message that stands in for `replaced`
    /// summarized messages
    pub fn summary(content: impl Into<String>, replaced: usize) -> Self {
        Self::system(content)
            .with_metadata(SUMMARY_KEY, serde_json::Value::Bool(true))
            .with_metadata(REPLACED_COUNT_KEY, serde_json::Value::from(replaced))
    }

    /// Attach exact token usage
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    /// Set a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this message was produced by summarizing compression
    pub fn is_summary(&self) -> bool {
        self.metadata
            .get(SUMMARY_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Number of messages this summary replaced, if it is one
    pub fn replaced_count(&self) -> Option<usize> {
        self.metadata
            .get(REPLACED_COUNT_KEY)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
    }

    /// Render as a `role: content` transcript line
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}
