use thiserror::Error;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Raised when the reasoning transport fails (network, auth, quota).
    #[error("reasoning call failed: {0}")]
    Reasoning(String),

    /// Raised when the model payload does not match the declared schema.
    #[error("invalid model payload: {0}")]
    Payload(String),

    /// Raised on action protocol violations (unknown action, bad params).
    #[error("action protocol violation: {0}")]
    Protocol(String),

    /// Raised when run configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AgentError {
    pub fn reasoning(message: impl Into<String>) -> Self {
        Self::Reasoning(message.into())
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
