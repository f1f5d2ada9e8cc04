//! Context budget tracking
//!
//! Approximates how much of the backend's context window a conversation
//! uses and flags when compression must run.
//!
//! # Features
//!
//! - Four-characters-per-token estimation, superseded by exact usage
//! - Message-count and window-percentage thresholds
//! - A sticky "compression due" flag cleared only after compression
//!
//! # Example
//!
//! ```rust,ignore
//! use colloquy_core::context::{ContextConfig, ContextTracker};
//!
//! let tracker = ContextTracker::new(ContextConfig::new().with_max_message_threshold(40));
//! tracker.recompute(&mut conversation);
//!
//! if conversation.context().compression_triggered {
//!     println!("{} tokens in use", conversation.context().total_tokens);
//! }
//! ```

mod config;
pub mod estimator;
mod state;
mod tracker;

pub use config::ContextConfig;
pub use estimator::{estimate_message_tokens, estimate_messages_tokens, estimate_text_tokens};
pub use state::ContextState;
pub use tracker::ContextTracker;
