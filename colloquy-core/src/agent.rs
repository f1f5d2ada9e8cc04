//! Agents and their registry
//!
//! An agent binds a system prompt and sampling settings to a completion
//! backend. Conversations reference agents by ID; the registry resolves them
//! at turn time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::llm::CompletionBackend;

/// An agent a conversation can talk to
#[derive(Clone)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    /// Model override passed to the backend
    pub model: Option<String>,
    /// Temperature for generation (0.0-2.0, default: 0.7)
    pub temperature: f32,
    /// Maximum tokens per reply (default: 1024)
    pub max_tokens: usize,
    pub backend: Arc<dyn CompletionBackend>,
}

impl AgentProfile {
    /// Create an agent named after its ID
    pub fn new(id: impl Into<String>, backend: Arc<dyn CompletionBackend>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            system_prompt: None,
            model: None,
            temperature: 0.7,
            max_tokens: 1024,
            backend,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }
}

impl fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("backend", &self.backend.model_info().provider)
            .finish()
    }
}

/// Registry of available agents
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<AgentProfile>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any previous agent with the same ID
    pub async fn register(&self, agent: AgentProfile) -> Option<Arc<AgentProfile>> {
        tracing::debug!(agent_id = %agent.id, "Registering agent");
        self.agents
            .write()
            .await
            .insert(agent.id.clone(), Arc::new(agent))
    }

    pub async fn get(&self, id: &str) -> Option<Arc<AgentProfile>> {
        self.agents.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<AgentProfile>> {
        self.agents.write().await.remove(id)
    }
}
