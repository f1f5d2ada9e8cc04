//! Compression receipts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::estimate_messages_tokens;
use crate::conversation::Message;

use super::config::CompressionStrategy;

/// Immutable receipt of one compression run.
///
/// `preserved_message_ids` and `removed_message_ids` partition the message
/// IDs that existed before the run. A summary message, when one was
/// inserted, is new and is reported separately as `summary_message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    /// Strategy that actually produced the new message list
    pub strategy: CompressionStrategy,
    /// Whether summarization failed and truncation ran instead
    pub fallback_used: bool,
    pub original_message_count: usize,
    /// Original messages that survived; equals `preserved_message_ids.len()`
    pub compressed_message_count: usize,
    pub original_token_count: usize,
    /// Estimated, not measured
    pub compressed_token_count: usize,
    pub summary: Option<String>,
    pub summary_message_id: Option<String>,
    pub preserved_message_ids: Vec<String>,
    pub removed_message_ids: Vec<String>,
    pub compressed_at: DateTime<Utc>,
}

impl CompressionResult {
    /// Number of original messages removed
    pub fn removed_count(&self) -> usize {
        self.removed_message_ids.len()
    }

    /// Whether the run changed nothing
    pub fn is_no_op(&self) -> bool {
        self.removed_message_ids.is_empty() && self.summary_message_id.is_none()
    }
}

/// A compression run's new message list together with its receipt
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub messages: Vec<Message>,
    pub result: CompressionResult,
}

impl CompressionOutcome {
    /// Keep the messages whose `keep` flag is set, in original order.
    ///
    /// The token estimate scales linearly with the retained share of messages.
    pub(crate) fn retain(
        strategy: CompressionStrategy,
        original: &[Message],
        keep: &[bool],
    ) -> Self {
        debug_assert_eq!(original.len(), keep.len());

        let mut messages = Vec::new();
        let mut preserved = Vec::new();
        let mut removed = Vec::new();
        for (message, &kept) in original.iter().zip(keep) {
            if kept {
                preserved.push(message.id.clone());
                messages.push(message.clone());
            } else {
                removed.push(message.id.clone());
            }
        }

        let original_tokens = estimate_messages_tokens(original);
        let compressed_tokens = scale_tokens(original_tokens, preserved.len(), original.len());

        Self {
            messages,
            result: CompressionResult {
                strategy,
                fallback_used: false,
                original_message_count: original.len(),
                compressed_message_count: preserved.len(),
                original_token_count: original_tokens,
                compressed_token_count: compressed_tokens,
                summary: None,
                summary_message_id: None,
                preserved_message_ids: preserved,
                removed_message_ids: removed,
                compressed_at: Utc::now(),
            },
        }
    }

    /// Outcome that keeps every message unchanged
    pub(crate) fn unchanged(strategy: CompressionStrategy, original: &[Message]) -> Self {
        Self::retain(strategy, original, &vec![true; original.len()])
    }

    /// Mark this outcome as produced by the summarize fallback path
    pub(crate) fn into_fallback(mut self) -> Self {
        self.result.fallback_used = true;
        self
    }
}

fn scale_tokens(tokens: usize, kept: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    ((tokens as u128 * kept as u128) / total as u128) as usize
}
