use thiserror::Error;

/// Errors surfaced by the device seams.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Screen capture failed or returned unusable data.
    #[error("screen capture failed: {0}")]
    Capture(String),

    /// A device automation primitive could not be performed.
    #[error("automation primitive failed: {0}")]
    Automation(String),

    /// A managed file could not be read or written.
    #[error("file operation failed: {0}")]
    File(String),

    /// The user-facing channel (speech, prompts) failed.
    #[error("user channel failed: {0}")]
    Channel(String),
}

impl BridgeError {
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn automation(message: impl Into<String>) -> Self {
        Self::Automation(message.into())
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }
}
