//! Derived budget state for one conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Budget state derived from a conversation's message list.
///
/// Everything except `compression_triggered` and `last_compression_at` is
/// recomputed from scratch on every recompute. The trigger flag is sticky:
/// the tracker sets it when a threshold is crossed and only
/// [`ContextTracker::mark_compressed`](super::ContextTracker::mark_compressed)
/// clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub total_messages: usize,
    pub total_tokens: usize,
    /// Share of `max_context_tokens` in use, 0-100 (may exceed 100)
    pub token_percentage_used: f64,
    pub max_context_tokens: usize,
    pub compression_triggered: bool,
    pub messages_until_compression: usize,
    pub last_compression_at: Option<DateTime<Utc>>,
}

impl ContextState {
    /// State for an empty conversation
    pub fn new(max_context_tokens: usize, max_message_threshold: usize) -> Self {
        Self {
            total_messages: 0,
            total_tokens: 0,
            token_percentage_used: 0.0,
            max_context_tokens,
            compression_triggered: false,
            messages_until_compression: max_message_threshold,
            last_compression_at: None,
        }
    }

    /// Tokens left before the window is full
    pub fn remaining_tokens(&self) -> usize {
        self.max_context_tokens.saturating_sub(self.total_tokens)
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::new(128_000, 50)
    }
}
