/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors reported by collaborators and domain constructors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No playable stream exists for a track
    #[error("Stream resolution failed: {0}")]
    Resolution(String),

    /// The audio engine rejected a command
    #[error("Transport error: {0}")]
    Transport(String),

    /// A remote service (recommendations, history) failed
    #[error("Service error: {0}")]
    Service(String),

    /// Persistent storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a service error
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
