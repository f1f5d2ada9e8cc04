//! # Colloquy - Long-running conversations under a token budget
//!
//! Colloquy keeps multi-turn conversations with a language-model backend
//! inside a hard context window:
//! - Token budget estimation per conversation
//! - A sticky "compression due" trigger on message count or window usage
//! - Three compression strategies: summarize, truncate, sliding window
//! - Summarization that falls back to truncation instead of failing a turn
//! - One in-flight turn per conversation, parallel across conversations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colloquy_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run(backend: Arc<dyn CompletionBackend>) -> Result<()> {
//! let agents = Arc::new(AgentRegistry::new());
//! agents
//!     .register(AgentProfile::new("assistant", backend).with_system_prompt("Be concise"))
//!     .await;
//!
//! let manager = ConversationManager::from_config(agents, &ColloquyConfig::load()?);
//! let conversation = manager.create(Some("assistant".to_string())).await;
//!
//! let reply = manager.append_turn(conversation.id(), "Remember: I prefer metric units", None).await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **context**: budget estimation and the per-conversation tracker
//! - **compression**: the strategy engine
//! - **conversation**: messages, conversations and the lifecycle manager
//! - **llm**: the completion backend contract hosts implement
//! - **agent**: agents binding prompts and settings to backends

pub mod agent;
pub mod compression;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod llm;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{AgentProfile, AgentRegistry};
    pub use crate::compression::{
        CompressionConfig, CompressionEngine, CompressionOutcome, CompressionResult,
        CompressionStrategy,
    };
    pub use crate::config::{ArchiveConfig, ColloquyConfig};
    pub use crate::context::{ContextConfig, ContextState, ContextTracker};
    pub use crate::conversation::{Conversation, ConversationManager, Message, MessageRole};
    pub use crate::error::{BackendError, ColloquyError, Resource, Result};
    pub use crate::llm::{
        ChatMessage, CompletionBackend, CompletionRequest, CompletionResponse, ModelInfo,
        StubBackend, TokenUsage,
    };
}
