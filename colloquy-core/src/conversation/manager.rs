//! Conversation Lifecycle Manager
//!
//! Owns every conversation held in memory and runs the per-turn cycle:
//! append the user message, ask the agent's backend for a reply, append it,
//! recompute the budget, and compress when the budget is threatened.
//!
//! Each conversation sits behind its own async mutex, held for a whole turn,
//! so at most one turn is in flight per conversation while different
//! conversations proceed in parallel.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::agent::AgentRegistry;
use crate::compression::{CompressionConfig, CompressionEngine, CompressionResult};
use crate::config::ColloquyConfig;
use crate::context::{ContextConfig, ContextTracker};
use crate::error::{ColloquyError, Result};
use crate::llm::{ChatMessage, CompletionRequest};

use super::message::{Message, MessageRole};
use super::session::Conversation;

/// Metadata key recording which model produced an assistant message
pub const MODEL_KEY: &str = "model";

type ConversationHandle = Arc<Mutex<Conversation>>;

/// In-memory owner of all conversations
pub struct ConversationManager {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
    agents: Arc<AgentRegistry>,
    tracker: ContextTracker,
    engine: CompressionEngine,
}

impl ConversationManager {
    pub fn new(
        agents: Arc<AgentRegistry>,
        context: ContextConfig,
        compression: CompressionConfig,
    ) -> Self {
        if compression.preserve_recent_messages >= context.max_message_threshold {
            tracing::warn!(
                preserve_recent_messages = compression.preserve_recent_messages,
                max_message_threshold = context.max_message_threshold,
                "Preserved tail reaches the message threshold; compression cannot get below it"
            );
        }
        Self {
            conversations: RwLock::new(HashMap::new()),
            agents,
            tracker: ContextTracker::new(context),
            engine: CompressionEngine::new(compression),
        }
    }

    /// Create a manager from the top-level configuration
    pub fn from_config(agents: Arc<AgentRegistry>, config: &ColloquyConfig) -> Self {
        Self::new(agents, config.context.clone(), config.compression.clone())
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }

    pub fn tracker(&self) -> &ContextTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &CompressionEngine {
        &self.engine
    }

    /// Create an empty conversation, optionally bound to an agent
    pub async fn create(&self, agent_id: Option<String>) -> Conversation {
        let conversation = Conversation::new(agent_id, self.tracker.initial_state());
        tracing::info!(
            conversation_id = %conversation.id(),
            agent_id = ?conversation.agent_id(),
            "Created conversation"
        );

        self.conversations.write().await.insert(
            conversation.id().to_string(),
            Arc::new(Mutex::new(conversation.clone())),
        );
        conversation
    }

    /// Run one turn and return the assistant's reply.
    ///
    /// The agent is `agent_id` if given, else the conversation's bound
    /// agent. If the backend fails the user message stays appended and the
    /// backend error is returned as is.
    pub async fn append_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        agent_id: Option<&str>,
    ) -> Result<Message> {
        let handle = self
            .handle(conversation_id)
            .await
            .ok_or_else(|| ColloquyError::conversation_not_found(conversation_id))?;
        let mut conversation = handle.lock().await;

        let agent_id = agent_id
            .or(conversation.agent_id())
            .map(str::to_string)
            .ok_or(ColloquyError::NoAgentSpecified)?;
        let agent = self
            .agents
            .get(&agent_id)
            .await
            .ok_or_else(|| ColloquyError::agent_not_found(&agent_id))?;

        conversation.push_message(Message::user(user_text));
        self.tracker.recompute(&mut conversation);

        let mut request = CompletionRequest::new(
            conversation.messages().iter().map(ChatMessage::from).collect(),
        )
        .with_model(agent.model.clone())
        .with_temperature(agent.temperature)
        .with_max_tokens(agent.max_tokens);
        if let Some(prompt) = &agent.system_prompt {
            request = request.with_system_prompt(prompt.clone());
        }

        let response = match agent.backend.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    agent_id = %agent_id,
                    retryable = e.retryable,
                    "Completion failed, user message kept: {}",
                    e
                );
                return Err(ColloquyError::Backend(e));
            }
        };

        let reply = Message::assistant(response.content)
            .with_usage(response.usage)
            .with_metadata(MODEL_KEY, serde_json::Value::String(response.model));
        conversation.push_message(reply.clone());

        if conversation.agent_id().is_none() {
            conversation.bind_agent(&agent_id);
        }
        let first_user_text = conversation
            .messages()
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone());
        if let Some(text) = first_user_text {
            conversation.title_from(&text);
        }

        self.tracker.recompute(&mut conversation);
        tracing::debug!(
            conversation_id = %conversation_id,
            agent_id = %agent_id,
            total_messages = conversation.context().total_messages,
            total_tokens = conversation.context().total_tokens,
            "Turn completed"
        );

        if conversation.context().compression_triggered {
            self.run_compression(&mut conversation).await;
        }

        Ok(reply)
    }

    /// Compress a conversation now, regardless of its budget state
    pub async fn compress_conversation(&self, conversation_id: &str) -> Result<CompressionResult> {
        let handle = self
            .handle(conversation_id)
            .await
            .ok_or_else(|| ColloquyError::conversation_not_found(conversation_id))?;
        let mut conversation = handle.lock().await;
        Ok(self.run_compression(&mut conversation).await)
    }

    /// Archive a conversation. Returns false if it does not exist.
    pub async fn archive(&self, conversation_id: &str) -> bool {
        self.set_archived(conversation_id, true).await
    }

    /// Undo [`archive`](Self::archive). Returns false if it does not exist.
    pub async fn unarchive(&self, conversation_id: &str) -> bool {
        self.set_archived(conversation_id, false).await
    }

    /// Delete a conversation. Returns false if it does not exist.
    pub async fn delete(&self, conversation_id: &str) -> bool {
        let removed = self
            .conversations
            .write()
            .await
            .remove(conversation_id)
            .is_some();
        if removed {
            tracing::info!(conversation_id = %conversation_id, "Deleted conversation");
        }
        removed
    }

    /// Archive every active conversation idle for longer than `days_threshold`
    /// days. Returns how many were archived by this call.
    pub async fn auto_archive_stale(&self, days_threshold: u32) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(days_threshold));
        let mut archived = 0;

        for handle in self.handles().await {
            let mut conversation = handle.lock().await;
            if !conversation.is_archived() && conversation.last_active_at() < cutoff {
                conversation.set_archived(true);
                archived += 1;
            }
        }

        if archived > 0 {
            tracing::info!(archived, days_threshold, "Archived stale conversations");
        }
        archived
    }

    /// Non-archived conversations active within `days_threshold` days, most
    /// recently active first
    pub async fn list_active(&self, days_threshold: u32) -> Vec<Conversation> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_threshold));
        let mut active: Vec<_> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|c| !c.is_archived() && c.last_active_at() >= cutoff)
            .collect();
        active.sort_by(|a, b| b.last_active_at().cmp(&a.last_active_at()));
        active
    }

    /// A copy of one conversation
    pub async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        let handle = self.handle(conversation_id).await?;
        let conversation = handle.lock().await;
        Some(conversation.clone())
    }

    /// Copies of all conversations, oldest first
    pub async fn list_all(&self) -> Vec<Conversation> {
        self.snapshot().await
    }

    /// Replace the in-memory set with conversations from storage.
    ///
    /// Each conversation's budget state is recomputed against the current
    /// configuration.
    pub async fn load_conversations(&self, conversations: Vec<Conversation>) {
        let mut loaded = HashMap::with_capacity(conversations.len());
        for mut conversation in conversations {
            self.tracker.recompute(&mut conversation);
            loaded.insert(
                conversation.id().to_string(),
                Arc::new(Mutex::new(conversation)),
            );
        }

        tracing::info!(count = loaded.len(), "Loaded conversations");
        *self.conversations.write().await = loaded;
    }

    /// Copies of all conversations for persistence, oldest first
    pub async fn export_conversations(&self) -> Vec<Conversation> {
        self.snapshot().await
    }

    async fn run_compression(&self, conversation: &mut Conversation) -> CompressionResult {
        let backend = match conversation.agent_id() {
            Some(agent_id) => self.agents.get(agent_id).await.map(|a| Arc::clone(&a.backend)),
            None => None,
        };

        tracing::debug!(
            conversation_id = %conversation.id(),
            strategy = %self.engine.config().strategy,
            total_messages = conversation.message_count(),
            "Compressing conversation"
        );

        let outcome = self.engine.compress(conversation, backend.as_deref()).await;
        let result = outcome.result;
        conversation.replace_messages(outcome.messages);
        self.tracker.mark_compressed(conversation, result.compressed_at);

        tracing::info!(
            conversation_id = %conversation.id(),
            strategy = %result.strategy,
            fallback_used = result.fallback_used,
            original_messages = result.original_message_count,
            removed_messages = result.removed_message_ids.len(),
            original_tokens = result.original_token_count,
            compressed_tokens = result.compressed_token_count,
            "Compressed conversation"
        );
        result
    }

    async fn set_archived(&self, conversation_id: &str, archived: bool) -> bool {
        let Some(handle) = self.handle(conversation_id).await else {
            return false;
        };
        handle.lock().await.set_archived(archived);
        tracing::info!(conversation_id = %conversation_id, archived, "Updated archive flag");
        true
    }

    async fn handle(&self, conversation_id: &str) -> Option<ConversationHandle> {
        self.conversations.read().await.get(conversation_id).cloned()
    }

    async fn handles(&self) -> Vec<ConversationHandle> {
        self.conversations.read().await.values().cloned().collect()
    }

    async fn snapshot(&self) -> Vec<Conversation> {
        let mut conversations = Vec::new();
        for handle in self.handles().await {
            conversations.push(handle.lock().await.clone());
        }
        conversations.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        conversations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentProfile;
    use crate::compression::CompressionStrategy;
    use crate::error::{BackendError, Resource};
    use crate::llm::{CompletionBackend, CompletionResponse, StubBackend, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies "re: <last message>" and counts calls
    #[derive(Default)]
    struct EchoBackend {
        calls: AtomicUsize,
        usage: Option<TokenUsage>,
    }

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(CompletionResponse {
                content: format!("re: {}", last),
                usage: self.usage,
                model: "echo-1".to_string(),
            })
        }
    }

    async fn manager_with(
        backend: Arc<dyn CompletionBackend>,
        context: ContextConfig,
        compression: CompressionConfig,
    ) -> ConversationManager {
        let agents = Arc::new(AgentRegistry::new());
        agents
            .register(AgentProfile::new("echo", backend).with_system_prompt("Be kind"))
            .await;
        ConversationManager::new(agents, context, compression)
    }

    async fn echo_manager() -> ConversationManager {
        manager_with(
            Arc::new(EchoBackend::default()),
            ContextConfig::default(),
            CompressionConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_create_conversation() {
        let manager = echo_manager().await;
        let conversation = manager.create(Some("echo".to_string())).await;

        assert!(conversation.messages().is_empty());
        assert_eq!(conversation.context().messages_until_compression, 50);
        assert_eq!(conversation.context().max_context_tokens, 128_000);
        assert!(manager.get(conversation.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_append_turn() {
        let manager = echo_manager().await;
        let conversation = manager.create(Some("echo".to_string())).await;

        let reply = manager
            .append_turn(conversation.id(), "Hello there", None)
            .await
            .unwrap();

        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "re: Hello there");
        assert_eq!(reply.metadata.get(MODEL_KEY).unwrap(), "echo-1");

        let stored = manager.get(conversation.id()).await.unwrap();
        assert_eq!(stored.message_count(), 2);
        assert_eq!(stored.title(), Some("Hello there"));
        assert_eq!(stored.context().total_messages, 2);
        assert_eq!(stored.context().messages_until_compression, 48);
        assert!(stored.last_active_at() >= conversation.last_active_at());
    }

    #[tokio::test]
    async fn test_usage_is_captured() {
        let usage = TokenUsage {
            prompt_tokens: 40,
            completion_tokens: 2,
            total_tokens: 42,
        };
        let backend = Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
            usage: Some(usage),
        });
        let manager =
            manager_with(backend, ContextConfig::default(), CompressionConfig::default()).await;
        let conversation = manager.create(Some("echo".to_string())).await;

        let reply = manager.append_turn(conversation.id(), "abcd", None).await.unwrap();

        assert_eq!(reply.usage, Some(usage));
        let stored = manager.get(conversation.id()).await.unwrap();
        // 1 estimated token for the user message plus 42 exact
        assert_eq!(stored.context().total_tokens, 43);
    }

    #[tokio::test]
    async fn test_missing_conversation() {
        let manager = echo_manager().await;
        let err = manager.append_turn("nope", "hi", Some("echo")).await.unwrap_err();
        assert!(matches!(
            err,
            ColloquyError::NotFound {
                resource: Resource::Conversation,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_agent() {
        let manager = echo_manager().await;
        let conversation = manager.create(None).await;

        let err = manager
            .append_turn(conversation.id(), "hi", Some("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ColloquyError::NotFound {
                resource: Resource::Agent,
                ..
            }
        ));
        // Nothing appended for caller-input errors
        assert_eq!(manager.get(conversation.id()).await.unwrap().message_count(), 0);
    }

    #[tokio::test]
    async fn test_no_agent_specified() {
        let manager = echo_manager().await;
        let conversation = manager.create(None).await;

        let err = manager.append_turn(conversation.id(), "hi", None).await.unwrap_err();
        assert!(matches!(err, ColloquyError::NoAgentSpecified));
    }

    #[tokio::test]
    async fn test_explicit_agent_binds_unbound_conversation() {
        let manager = echo_manager().await;
        let conversation = manager.create(None).await;

        manager
            .append_turn(conversation.id(), "hi", Some("echo"))
            .await
            .unwrap();

        let stored = manager.get(conversation.id()).await.unwrap();
        assert_eq!(stored.agent_id(), Some("echo"));
        // Later turns can rely on the binding
        manager.append_turn(conversation.id(), "again", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_user_message() {
        let manager = manager_with(
            Arc::new(StubBackend),
            ContextConfig::default(),
            CompressionConfig::default(),
        )
        .await;
        let conversation = manager.create(Some("echo".to_string())).await;

        let err = manager
            .append_turn(conversation.id(), "are you there?", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ColloquyError::Backend(_)));
        assert!(!err.is_retryable());

        let stored = manager.get(conversation.id()).await.unwrap();
        assert_eq!(stored.message_count(), 1);
        assert_eq!(stored.messages()[0].content, "are you there?");
        assert_eq!(stored.context().total_messages, 1);
        assert!(stored.title().is_none());
    }

    #[tokio::test]
    async fn test_turn_triggers_compression() {
        let manager = manager_with(
            Arc::new(EchoBackend::default()),
            ContextConfig::new().with_max_message_threshold(6),
            CompressionConfig::new()
                .with_strategy(CompressionStrategy::SlidingWindow)
                .with_preserve_recent_messages(2),
        )
        .await;
        let conversation = manager.create(Some("echo".to_string())).await;

        for i in 0..2 {
            manager
                .append_turn(conversation.id(), &format!("turn {}", i), None)
                .await
                .unwrap();
        }
        let before = manager.get(conversation.id()).await.unwrap();
        assert_eq!(before.message_count(), 4);
        assert!(before.context().last_compression_at.is_none());

        manager.append_turn(conversation.id(), "turn 2", None).await.unwrap();

        let after = manager.get(conversation.id()).await.unwrap();
        assert_eq!(after.message_count(), 2);
        assert_eq!(after.messages()[0].content, "turn 2");
        assert!(!after.context().compression_triggered);
        assert!(after.context().last_compression_at.is_some());
        assert_eq!(after.context().messages_until_compression, 4);
    }

    /// Reports a large exact usage when asked for a long answer
    struct VerboseBackend;

    #[async_trait]
    impl CompletionBackend for VerboseBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<CompletionResponse, BackendError> {
            let long = request
                .messages
                .last()
                .is_some_and(|m| m.content.starts_with("long"));
            Ok(CompletionResponse {
                content: "ok".to_string(),
                usage: long.then_some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 840,
                    total_tokens: 850,
                }),
                model: "verbose".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_token_usage_triggers_compression() {
        let manager = manager_with(
            Arc::new(VerboseBackend),
            ContextConfig::new().with_max_context_tokens(1000),
            CompressionConfig::new()
                .with_strategy(CompressionStrategy::SlidingWindow)
                .with_preserve_recent_messages(2),
        )
        .await;
        let conversation = manager.create(Some("echo".to_string())).await;

        manager.append_turn(conversation.id(), "hi", None).await.unwrap();
        manager.append_turn(conversation.id(), "hello", None).await.unwrap();
        let before = manager.get(conversation.id()).await.unwrap();
        assert!(before.context().last_compression_at.is_none());
        assert!(!before.context().compression_triggered);

        // Six messages, far below the message threshold, but 850 reported
        // tokens put the window past 80%
        manager
            .append_turn(conversation.id(), "long answer please", None)
            .await
            .unwrap();

        let after = manager.get(conversation.id()).await.unwrap();
        assert!(after.context().last_compression_at.is_some());
        assert_eq!(after.message_count(), 2);
        assert_eq!(after.messages()[0].content, "long answer please");
        assert_eq!(after.messages()[1].usage.map(|u| u.total_tokens), Some(850));
        // The kept reply alone still exceeds the budget
        assert!(after.context().compression_triggered);
    }

    #[tokio::test]
    async fn test_summarize_uses_bound_backend() {
        let backend = Arc::new(EchoBackend::default());
        let manager = manager_with(
            backend.clone(),
            ContextConfig::new().with_max_message_threshold(4),
            CompressionConfig::new().with_preserve_recent_messages(2),
        )
        .await;
        let conversation = manager.create(Some("echo".to_string())).await;

        manager.append_turn(conversation.id(), "first", None).await.unwrap();
        manager.append_turn(conversation.id(), "second", None).await.unwrap();

        // Two turns plus one summarization request
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        let stored = manager.get(conversation.id()).await.unwrap();
        assert_eq!(stored.message_count(), 3);
        assert!(stored.messages()[0].is_summary());
        assert_eq!(stored.messages()[1].content, "second");
    }

    #[tokio::test]
    async fn test_manual_compression() {
        let manager = echo_manager().await;
        let conversation = manager.create(Some("echo".to_string())).await;
        for i in 0..8 {
            manager
                .append_turn(conversation.id(), &format!("turn {}", i), None)
                .await
                .unwrap();
        }

        let result = manager.compress_conversation(conversation.id()).await.unwrap();

        assert_eq!(result.strategy, CompressionStrategy::Summarize);
        assert_eq!(result.original_message_count, 16);
        assert_eq!(result.removed_message_ids.len(), 6);
        let stored = manager.get(conversation.id()).await.unwrap();
        assert_eq!(stored.message_count(), 11);
        assert_eq!(stored.context().total_messages, 11);

        assert!(manager.compress_conversation("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_archive_and_delete() {
        let manager = echo_manager().await;
        let conversation = manager.create(None).await;

        assert!(manager.archive(conversation.id()).await);
        assert!(manager.get(conversation.id()).await.unwrap().is_archived());
        assert!(manager.list_active(30).await.is_empty());

        assert!(manager.unarchive(conversation.id()).await);
        assert_eq!(manager.list_active(30).await.len(), 1);

        assert!(manager.delete(conversation.id()).await);
        assert!(!manager.delete(conversation.id()).await);
        assert!(!manager.archive(conversation.id()).await);
        assert!(manager.get(conversation.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_auto_archive_stale_is_idempotent() {
        let manager = echo_manager().await;
        let tracker = manager.tracker().clone();
        let old = Conversation::new(None, tracker.initial_state())
            .with_last_active_at(Utc::now() - Duration::days(45));
        let recent = Conversation::new(None, tracker.initial_state())
            .with_last_active_at(Utc::now() - Duration::days(2));
        let old_id = old.id().to_string();
        manager.load_conversations(vec![old, recent]).await;

        assert_eq!(manager.auto_archive_stale(30).await, 1);
        assert_eq!(manager.auto_archive_stale(30).await, 0);
        assert!(manager.get(&old_id).await.unwrap().is_archived());
    }

    #[tokio::test]
    async fn test_list_active_ordering() {
        let manager = echo_manager().await;
        let tracker = manager.tracker().clone();
        let make = |days: i64| {
            Conversation::new(None, tracker.initial_state())
                .with_last_active_at(Utc::now() - Duration::days(days))
        };
        let (a, b, c, stale) = (make(5), make(1), make(3), make(60));
        let expected = vec![b.id().to_string(), c.id().to_string(), a.id().to_string()];
        manager.load_conversations(vec![a, b, c, stale]).await;

        let active: Vec<_> = manager
            .list_active(30)
            .await
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(active, expected);
        assert_eq!(manager.list_all().await.len(), 4);
    }

    #[tokio::test]
    async fn test_load_recomputes_state() {
        let manager = echo_manager().await;
        let messages = vec![Message::user("a".repeat(40)), Message::assistant("b".repeat(40))];
        let conversation =
            Conversation::new(None, manager.tracker().initial_state()).with_messages(messages);
        let id = conversation.id().to_string();

        manager.load_conversations(vec![conversation]).await;

        let loaded = manager.get(&id).await.unwrap();
        assert_eq!(loaded.context().total_messages, 2);
        assert_eq!(loaded.context().total_tokens, 20);
        assert_eq!(manager.export_conversations().await, vec![loaded]);
    }
}
