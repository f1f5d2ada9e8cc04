//! Error types for Colloquy operations

use std::fmt;

/// Result type for Colloquy operations
pub type Result<T> = std::result::Result<T, ColloquyError>;

/// Kind of resource a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Conversation,
    Agent,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Conversation => write!(f, "Conversation"),
            Resource::Agent => write!(f, "Agent"),
        }
    }
}

/// Error returned by a completion backend.
///
/// Carries the backend's hint on whether the same request may succeed if
/// issued again. Colloquy never retries on its own; the hint is for callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable failure description
    pub message: String,
    /// Whether the backend considers the failure transient
    pub retryable: bool,
}

impl BackendError {
    /// A transient failure (rate limits, timeouts, 5xx)
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A permanent failure (bad credentials, invalid request)
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<anyhow::Error> for BackendError {
    fn from(err: anyhow::Error) -> Self {
        BackendError::fatal(err.to_string())
    }
}

/// Error types for Colloquy
#[derive(Debug, thiserror::Error)]
pub enum ColloquyError {
    /// Conversation or agent missing
    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    /// Neither an explicit nor a conversation-bound agent was available
    #[error("No agent specified for turn and conversation has no bound agent")]
    NoAgentSpecified,

    /// Completion request failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ColloquyError {
    pub(crate) fn conversation_not_found(id: impl Into<String>) -> Self {
        ColloquyError::NotFound {
            resource: Resource::Conversation,
            id: id.into(),
        }
    }

    pub(crate) fn agent_not_found(id: impl Into<String>) -> Self {
        ColloquyError::NotFound {
            resource: Resource::Agent,
            id: id.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only backend failures can be retryable; caller-input errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ColloquyError::Backend(err) => err.retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ColloquyError::conversation_not_found("abc");
        assert_eq!(err.to_string(), "Conversation not found: abc");

        let err = ColloquyError::agent_not_found("helper");
        assert_eq!(err.to_string(), "Agent not found: helper");
    }

    #[test]
    fn test_retryable_hint() {
        let err: ColloquyError = BackendError::retryable("rate limited").into();
        assert!(err.is_retryable());

        let err: ColloquyError = BackendError::fatal("bad key").into();
        assert!(!err.is_retryable());

        assert!(!ColloquyError::NoAgentSpecified.is_retryable());
    }

    #[test]
    fn test_backend_error_from_anyhow() {
        let err: BackendError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.message, "connection refused");
        assert!(!err.retryable);
    }
}
