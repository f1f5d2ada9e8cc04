//! Token budget estimation
//!
//! Colloquy does not tokenize. It approximates with a fixed ratio of four
//! characters per token, rounded up, and prefers exact usage whenever a
//! backend reported it for a message.

use crate::conversation::Message;

/// Characters per token estimate
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens for a text string
pub fn estimate_text_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Token count for a single message.
///
/// Exact backend usage supersedes the character approximation.
pub fn estimate_message_tokens(message: &Message) -> usize {
    match message.usage {
        Some(usage) => usage.total_tokens,
        None => estimate_text_tokens(&message.content),
    }
}

/// Total token count for a message list
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
