//! Cadence - Queue & Playback Controller
//!
//! The orchestration core of the Cadence player: what is playing, what comes
//! next, how the listening queue grows over a long session, and how playback
//! state stays consistent across an async, interruptible audio pipeline.
//!
//! This crate provides:
//! - Windowed, shuffle-aware queue fed by recommendations
//! - Playback state machine over a black-box transport
//! - Progress clock with end-of-track auto-advance
//! - Session persistence and restore
//! - Remote-control (lock screen) command wiring
//!
//! # Architecture
//!
//! `cadence-playback` performs no I/O of its own. The audio engine, stream
//! resolution, recommendations, history and persistence are collaborators
//! defined in `cadence-core` and injected through [`Collaborators`].
//!
//! # Example: Queue
//!
//! ```rust
//! use cadence_core::Track;
//! use cadence_playback::{QueueManager, RecommendationBatch, RepeatMode};
//!
//! let album: Vec<Track> = ["a", "b", "c"]
//!     .iter()
//!     .map(|id| Track::new(*id, id.to_uppercase()).unwrap())
//!     .collect();
//!
//! let mut queue = QueueManager::default();
//! queue.establish(album[1].clone(), Some(album.clone()), None);
//! assert_eq!(queue.current().unwrap().id(), "b");
//!
//! // Recommendations play right after the current track
//! let recs = vec![Track::new("x", "X").unwrap(), Track::new("a", "A").unwrap()];
//! let added = queue.extend(RecommendationBatch::new(recs, Default::default()));
//! assert_eq!(added.len(), 1);
//! assert_eq!(queue.next().unwrap().id(), "x");
//!
//! queue.set_repeat_mode(RepeatMode::One);
//! assert_eq!(queue.next().unwrap().id(), "x");
//! ```
//!
//! # Example: Controller
//!
//! ```rust,ignore
//! let controller = PlaybackController::new(PlaybackConfig::default(), collaborators)?;
//! let mut updates = controller.subscribe();
//!
//! controller.play_track(track, None, None).await?;
//! while let Some(session) = updates.recv().await {
//!     println!("{:?} {:.1}s", session.status, session.position_secs);
//! }
//! ```

mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod history;
pub mod queue;
pub mod recommend;
mod remote;
mod shuffle;
pub mod types;

pub use config::{ClockSettings, PlaybackConfig, QueueSettings};
pub use controller::{Collaborators, PlaybackController};
pub use error::{PlaybackError, Result};
pub use events::SessionSubscription;
pub use history::{HistoryEntry, InMemoryHistory};
pub use queue::QueueManager;
pub use recommend::{fetch_batch, filter_recommendations, RecommendationBatch};
pub use types::{PlaybackSession, PlaybackStatus, RepeatMode, WindowedQueue};

// Collaborator contracts, re-exported for convenience
pub use cadence_core::{
    CommandHandler, HistoryRecorder, NowPlaying, RecommendationSource, RemoteCommand,
    RemoteControl, RemoteControlBridge, SessionState, SessionStateStore, StreamResolver, Track,
    TransportAdapter,
};
