//! Compression dispatch

use crate::conversation::Conversation;
use crate::llm::CompletionBackend;

use super::config::{CompressionConfig, CompressionStrategy};
use super::result::CompressionOutcome;
use super::summarize::summarize;
use super::truncation::{sliding_window, truncate};

/// Runs the configured compression strategy over a conversation.
///
/// Never fails: summarization problems fall back to truncation of the same
/// input, so callers either get the summarized list or the truncated one.
#[derive(Debug, Clone, Default)]
pub struct CompressionEngine {
    config: CompressionConfig,
}

impl CompressionEngine {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compute the compressed message list for `conversation`.
    ///
    /// The conversation itself is not modified; applying the outcome is the
    /// caller's job. `backend` is only consulted by the summarize strategy.
    pub async fn compress(
        &self,
        conversation: &Conversation,
        backend: Option<&dyn CompletionBackend>,
    ) -> CompressionOutcome {
        let messages = conversation.messages();

        match self.config.strategy {
            CompressionStrategy::Summarize => {
                let Some(backend) = backend else {
                    tracing::warn!(
                        conversation_id = %conversation.id(),
                        "No completion backend for summarization, falling back to truncate"
                    );
                    return truncate(messages, &self.config).into_fallback();
                };

                match summarize(messages, &self.config, backend).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(
                            conversation_id = %conversation.id(),
                            retryable = e.retryable,
                            "Summarization failed, falling back to truncate: {}",
                            e
                        );
                        truncate(messages, &self.config).into_fallback()
                    }
                }
            }
            CompressionStrategy::Truncate => truncate(messages, &self.config),
            CompressionStrategy::SlidingWindow => sliding_window(messages, &self.config),
        }
    }
}
