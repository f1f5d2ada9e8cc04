//! Summarizing compression
//!
//! Folds everything older than the preserved tail into one backend-written
//! system message.

use chrono::Utc;

use crate::context::estimate_messages_tokens;
use crate::conversation::Message;
use crate::error::BackendError;
use crate::llm::{ChatMessage, CompletionBackend, CompletionRequest};

use super::config::{CompressionConfig, CompressionStrategy};
use super::result::{CompressionOutcome, CompressionResult};

/// Built-in summarization instruction
pub const DEFAULT_SUMMARY_PROMPT: &str = "\
Summarize the following conversation concisely. Preserve:
- User preferences and personal details they shared
- Decisions that were made and their reasons
- Open tasks, action items and commitments
- Any context needed to continue the conversation naturally

Write the summary as plain prose, without preamble.";

/// Share of the original token count assumed to remain after summarizing.
///
/// A fixed heuristic: the new message list is not re-measured.
pub const SUMMARY_TOKEN_RATIO: f64 = 0.3;

/// Temperature for summarization requests
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Upper bound on summary length, in tokens
pub const MAX_SUMMARY_TOKENS: usize = 1000;

/// Summarize all but the `preserve_recent_messages` newest messages.
///
/// Returns an unchanged outcome when there is nothing older than the tail.
/// Any backend failure, including an empty summary, is returned as an error
/// and leaves `messages` untouched.
pub async fn summarize(
    messages: &[Message],
    config: &CompressionConfig,
    backend: &dyn CompletionBackend,
) -> Result<CompressionOutcome, BackendError> {
    let split = messages.len().saturating_sub(config.preserve_recent_messages);
    let (head, tail) = messages.split_at(split);

    if head.is_empty() {
        return Ok(CompressionOutcome::unchanged(
            CompressionStrategy::Summarize,
            messages,
        ));
    }

    let request = build_request(head, config);
    let response = backend.complete(&request).await?;
    let summary = response.content.trim().to_string();
    if summary.is_empty() {
        return Err(BackendError::fatal("Backend returned an empty summary"));
    }

    let summary_message = Message::summary(summary.clone(), head.len());
    let summary_message_id = summary_message.id.clone();

    let original_tokens = estimate_messages_tokens(messages);
    let compressed_tokens = (original_tokens as f64 * SUMMARY_TOKEN_RATIO).ceil() as usize;

    let mut new_messages = Vec::with_capacity(tail.len() + 1);
    new_messages.push(summary_message);
    new_messages.extend_from_slice(tail);

    Ok(CompressionOutcome {
        messages: new_messages,
        result: CompressionResult {
            strategy: CompressionStrategy::Summarize,
            fallback_used: false,
            original_message_count: messages.len(),
            compressed_message_count: tail.len(),
            original_token_count: original_tokens,
            compressed_token_count: compressed_tokens,
            summary: Some(summary),
            summary_message_id: Some(summary_message_id),
            preserved_message_ids: tail.iter().map(|m| m.id.clone()).collect(),
            removed_message_ids: head.iter().map(|m| m.id.clone()).collect(),
            compressed_at: Utc::now(),
        },
    })
}

/// Output budget for the summary: half the target, capped
pub fn summary_token_limit(config: &CompressionConfig) -> usize {
    MAX_SUMMARY_TOKENS.min(config.target_tokens / 2)
}

fn build_request(head: &[Message], config: &CompressionConfig) -> CompletionRequest {
    let transcript = head
        .iter()
        .map(Message::transcript_line)
        .collect::<Vec<_>>()
        .join("\n");

    let instruction = config
        .summary_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SUMMARY_PROMPT);

    let prompt = format!("{}\n\nConversation:\n{}", instruction, transcript);

    CompletionRequest::new(vec![ChatMessage::user(prompt)])
        .with_temperature(SUMMARY_TEMPERATURE)
        .with_max_tokens(summary_token_limit(config))
}
