//! Core types for playback management

use cadence_core::Track;
use serde::{Deserialize, Serialize};

/// Playback status (the controller's state-machine state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing loaded
    #[default]
    Idle,

    /// Stream resolution / transport load in flight
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Last operation failed; recoverable by the next successful play
    Error,
}

/// Repeat mode
///
/// Governs auto-advance only; never changes queue content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the `off -> all -> one -> off` rotation
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounded slice of the queue around the current track, for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowedQueue {
    /// Tracks in play order
    pub tracks: Vec<Track>,

    /// Position of the current track within `tracks` (`None` when empty)
    pub relative_index: Option<usize>,
}

/// The controller's live state, broadcast to subscribers on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub queue: WindowedQueue,
    pub shuffled: bool,
    pub repeat_mode: RepeatMode,
    /// Human-readable message for the last failure, cleared on the next load
    pub last_error: Option<String>,
}

impl PlaybackSession {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(Track::id)
    }
}
