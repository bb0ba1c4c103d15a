/// Collaborator contracts consumed by the playback core
use crate::error::Result;
use crate::types::{NowPlaying, RemoteCommand, SessionState, Track};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Source of "more like this" recommendations
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Fetch recommendations seeded from a track
    ///
    /// An empty list means "no results" and is not an error.
    ///
    /// # Errors
    /// Returns an error only for genuine transport/service failures
    async fn fetch(&self, seed_track_id: &str) -> Result<Vec<Track>>;
}

/// Listening history
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record that a track was listened to for `played_secs` seconds
    async fn record(&self, track: &Track, played_secs: f64) -> Result<()>;

    /// Ids of tracks played within the last `window`
    async fn recently_played_ids(&self, window: Duration) -> Result<HashSet<String>>;
}

/// Resolves a track to a playable stream URL
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolve a stream URL
    ///
    /// # Errors
    /// Fails with a descriptive error if no playable URL exists
    async fn resolve(&self, track: &Track) -> Result<String>;
}

/// Black-box audio engine
///
/// Commands are async because engines typically hop to their own thread;
/// position queries are cheap snapshots and stay synchronous.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Load a stream, replacing whatever was loaded
    async fn load(&self, url: &str) -> Result<()>;

    /// Start or resume playback of the loaded stream
    async fn play(&self) -> Result<()>;

    /// Pause playback
    async fn pause(&self) -> Result<()>;

    /// Seek to position (in seconds)
    async fn seek(&self, position_secs: f64) -> Result<()>;

    /// Unload the stream and free engine resources
    async fn release(&self) -> Result<()>;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration of the loaded stream in seconds (0 if unknown)
    fn duration(&self) -> f64;

    /// Whether audio is currently audible
    fn is_playing(&self) -> bool;
}

/// Handler invoked by the bridge for every external command
pub type CommandHandler = Arc<dyn Fn(RemoteCommand) + Send + Sync>;

/// Lock-screen / notification media controls
#[async_trait]
pub trait RemoteControlBridge: Send + Sync {
    /// Publish now-playing metadata
    async fn push_now_playing(&self, metadata: NowPlaying) -> Result<()>;

    /// Publish play/pause state and position
    async fn push_playback_state(&self, is_playing: bool, position_secs: f64) -> Result<()>;

    /// Register the handler that receives external commands
    ///
    /// Replaces any previously registered handler.
    fn set_command_handler(&self, handler: CommandHandler);
}

/// Optional OS media-control capability, resolved once at startup
#[derive(Clone, Default)]
pub enum RemoteControl {
    /// Media controls exist on this platform
    Available(Arc<dyn RemoteControlBridge>),

    /// No media-session module on this platform
    #[default]
    Unavailable,
}

impl RemoteControl {
    /// Get the bridge if the capability is present
    pub fn bridge(&self) -> Option<&Arc<dyn RemoteControlBridge>> {
        match self {
            Self::Available(bridge) => Some(bridge),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl std::fmt::Debug for RemoteControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(_) => f.write_str("RemoteControl::Available"),
            Self::Unavailable => f.write_str("RemoteControl::Unavailable"),
        }
    }
}

/// Persists `{track, position}` across process restarts
#[async_trait]
pub trait SessionStateStore: Send + Sync {
    /// Save the current session
    async fn save(&self, state: &SessionState) -> Result<()>;

    /// Load the last saved session, if any
    async fn load(&self) -> Result<Option<SessionState>>;
}
