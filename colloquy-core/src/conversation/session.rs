//! Conversation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ContextState;

use super::message::Message;

/// Maximum title length, in characters
const TITLE_MAX_CHARS: usize = 50;

/// A conversation.
///
/// Once handed to a [`ConversationManager`](super::ConversationManager) its
/// message list only changes through the manager: turns append, compression
/// replaces a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    id: String,
    /// Agent bound to this conversation
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    context: ContextState,
}

impl Conversation {
    /// Create an empty conversation with a fresh ID
    pub fn new(agent_id: Option<String>, context: ContextState) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id,
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            last_active_at: now,
            archived: false,
            context,
        }
    }

    /// Seed messages, e.g. when rebuilding a conversation from storage
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Override the activity timestamps, e.g. when rebuilding from storage
    pub fn with_last_active_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self.last_active_at = at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    /// Current budget state
    pub fn context(&self) -> &ContextState {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut ContextState {
        &mut self.context
    }

    pub(crate) fn bind_agent(&mut self, agent_id: impl Into<String>) {
        self.agent_id = Some(agent_id.into());
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
        self.updated_at = Utc::now();
    }

    /// Title the conversation from `text` unless it already has one
    pub(crate) fn title_from(&mut self, text: &str) {
        if self.title.is_some() {
            return;
        }
        let trimmed = text.trim();
        let title = if trimmed.chars().count() > TITLE_MAX_CHARS {
            let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", head)
        } else {
            trimmed.to_string()
        };
        self.title = Some(title);
    }

    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.last_active_at = now;
    }
}
