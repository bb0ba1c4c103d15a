//! Error types for playback management

use cadence_core::CoreError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaybackError {
    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// No playable stream could be found for a track
    #[error("Couldn't play \"{title}\": {source}")]
    Resolution {
        title: String,
        #[source]
        source: CoreError,
    },

    /// The audio engine rejected a command
    #[error("Playback failed while trying to {action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: CoreError,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlaybackError {
    pub(crate) fn resolution(title: &str, source: CoreError) -> Self {
        Self::Resolution {
            title: title.to_string(),
            source,
        }
    }

    pub(crate) fn transport(action: &'static str, source: CoreError) -> Self {
        Self::Transport { action, source }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
