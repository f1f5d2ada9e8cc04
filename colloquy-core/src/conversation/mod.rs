//! Conversation Management
//!
//! Multi-turn conversations with budget tracking and automatic compression.
//!
//! # Features
//!
//! - Conversation lifecycle (create, turn, archive, delete)
//! - Per-conversation serialization of turns
//! - Automatic compression when the budget is threatened
//! - Load/export hooks for an external storage layer
//!
//! # Example
//!
//! ```rust,ignore
//! use colloquy_core::conversation::ConversationManager;
//!
//! let manager = ConversationManager::from_config(agents, &config);
//! let conversation = manager.create(Some("assistant".to_string())).await;
//!
//! let reply = manager.append_turn(conversation.id(), "Hello!", None).await?;
//! println!("{}", reply.content);
//! ```

mod manager;
mod message;
mod session;

pub use manager::{ConversationManager, MODEL_KEY};
pub use message::{Message, MessageRole, REPLACED_COUNT_KEY, SUMMARY_KEY};
pub use session::Conversation;
