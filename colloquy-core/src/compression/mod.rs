//! Conversation compression
//!
//! Three interchangeable ways to shrink a conversation's message list:
//!
//! - **summarize**: older messages become one backend-written summary
//! - **truncate**: keep system messages and the newest messages
//! - **sliding window**: keep only the newest messages
//!
//! Every run returns a [`CompressionResult`] whose preserved and removed ID
//! lists partition the original messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use colloquy_core::compression::{CompressionConfig, CompressionEngine, CompressionStrategy};
//!
//! let engine = CompressionEngine::new(
//!     CompressionConfig::new()
//!         .with_strategy(CompressionStrategy::Summarize)
//!         .with_preserve_recent_messages(6),
//! );
//!
//! let outcome = engine.compress(&conversation, Some(backend.as_ref())).await;
//! println!("removed {} messages", outcome.result.removed_count());
//! ```

mod config;
mod engine;
mod result;
mod summarize;
mod truncation;

pub use config::{CompressionConfig, CompressionStrategy};
pub use engine::CompressionEngine;
pub use result::{CompressionOutcome, CompressionResult};
pub use summarize::{
    DEFAULT_SUMMARY_PROMPT, MAX_SUMMARY_TOKENS, SUMMARY_TEMPERATURE, SUMMARY_TOKEN_RATIO,
    summarize, summary_token_limit,
};
pub use truncation::{sliding_window, truncate};
