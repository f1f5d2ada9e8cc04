//! Context Tracker
//!
//! Keeps each conversation's [`ContextState`] in step with its messages and
//! decides when compression is due.

use chrono::{DateTime, Utc};

use crate::conversation::Conversation;

use super::config::ContextConfig;
use super::estimator::estimate_messages_tokens;
use super::state::ContextState;

/// Tracks token budget and compression triggers
#[derive(Debug, Clone)]
pub struct ContextTracker {
    config: ContextConfig,
}

impl ContextTracker {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// State for a freshly created conversation
    pub fn initial_state(&self) -> ContextState {
        ContextState::new(
            self.config.max_context_tokens,
            self.config.max_message_threshold,
        )
    }

    /// Rebuild the conversation's state from its messages.
    ///
    /// Sets `compression_triggered` when a threshold is crossed but never
    /// clears it. Idempotent for an unchanged message list.
    pub fn recompute(&self, conversation: &mut Conversation) {
        let total_messages = conversation.message_count();
        let total_tokens = estimate_messages_tokens(conversation.messages());
        let due = self.thresholds_reached(
            total_messages,
            total_tokens,
            self.config.max_message_threshold,
            self.config.max_token_percentage,
        );

        let state = conversation.context_mut();
        state.total_messages = total_messages;
        state.total_tokens = total_tokens;
        state.token_percentage_used = self.percentage_of_window(total_tokens);
        state.max_context_tokens = self.config.max_context_tokens;
        state.messages_until_compression = self
            .config
            .max_message_threshold
            .saturating_sub(total_messages);
        if due {
            state.compression_triggered = true;
        }
    }

    /// Whether compression is due under the given thresholds.
    ///
    /// Evaluated against the current messages; ignores the stored flag.
    pub fn should_compress(
        &self,
        conversation: &Conversation,
        max_messages: usize,
        max_token_percentage: f64,
    ) -> bool {
        self.thresholds_reached(
            conversation.message_count(),
            estimate_messages_tokens(conversation.messages()),
            max_messages,
            max_token_percentage,
        )
    }

    /// Record a finished compression: clear the flag, stamp the time, recompute
    pub fn mark_compressed(&self, conversation: &mut Conversation, at: DateTime<Utc>) {
        let state = conversation.context_mut();
        state.compression_triggered = false;
        state.last_compression_at = Some(at);
        self.recompute(conversation);
    }

    fn percentage_of_window(&self, tokens: usize) -> f64 {
        if self.config.max_context_tokens == 0 {
            return 0.0;
        }
        tokens as f64 * 100.0 / self.config.max_context_tokens as f64
    }

    /// Compares `tokens / window >= max_percentage / 100` without dividing,
    /// so a threshold reached exactly is never lost to rounding.
    fn thresholds_reached(
        &self,
        messages: usize,
        tokens: usize,
        max_messages: usize,
        max_percentage: f64,
    ) -> bool {
        if messages >= max_messages {
            return true;
        }
        let window = self.config.max_context_tokens;
        window > 0 && tokens as f64 * 100.0 >= max_percentage * window as f64
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
