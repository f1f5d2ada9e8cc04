//! Truncation strategies
//!
//! Both strategies only drop whole messages and never reorder them.

use crate::conversation::{Message, MessageRole};

use super::config::{CompressionConfig, CompressionStrategy};
use super::result::CompressionOutcome;

/// Keep system messages (when configured) plus the most recent
/// `preserve_recent_messages` other messages.
///
/// Without the system exemption every role is treated alike, so at most
/// `len - preserve_recent_messages` messages are ever removed.
pub fn truncate(messages: &[Message], config: &CompressionConfig) -> CompressionOutcome {
    let recent = config.preserve_recent_messages;

    let keep: Vec<bool> = if config.preserve_system_messages {
        let non_system = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .count();
        let skip = non_system.saturating_sub(recent);

        let mut seen = 0;
        messages
            .iter()
            .map(|m| {
                if m.role == MessageRole::System {
                    return true;
                }
                seen += 1;
                seen > skip
            })
            .collect()
    } else {
        recent_mask(messages.len(), recent)
    };

    CompressionOutcome::retain(CompressionStrategy::Truncate, messages, &keep)
}

/// Keep exactly the last `preserve_recent_messages` messages, any role
pub fn sliding_window(messages: &[Message], config: &CompressionConfig) -> CompressionOutcome {
    let keep = recent_mask(messages.len(), config.preserve_recent_messages);
    CompressionOutcome::retain(CompressionStrategy::SlidingWindow, messages, &keep)
}

fn recent_mask(len: usize, recent: usize) -> Vec<bool> {
    let start = len.saturating_sub(recent);
    (0..len).map(|i| i >= start).collect()
}
