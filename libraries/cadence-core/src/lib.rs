//! Cadence Core
//!
//! Platform-agnostic domain types, collaborator traits, and error handling for
//! the Cadence playback core.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `NowPlaying`, `SessionState`, `RemoteCommand`
//! - **Collaborator Traits**: `RecommendationSource`, `HistoryRecorder`,
//!   `StreamResolver`, `TransportAdapter`, `RemoteControlBridge`, `SessionStateStore`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! Everything that talks to the outside world (content SDK, audio engine,
//! key-value storage, OS media controls) is consumed through these traits, so
//! the playback crate never depends on a concrete platform.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::Track;
//!
//! let track = Track::new("trk-42", "Teardrop")
//!     .unwrap()
//!     .with_artists(["Massive Attack"])
//!     .with_album("Mezzanine");
//!
//! assert_eq!(track.id(), "trk-42");
//! assert_eq!(track.artist_line(), "Massive Attack");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use traits::{
    CommandHandler, HistoryRecorder, RecommendationSource, RemoteControl, RemoteControlBridge,
    SessionStateStore, StreamResolver, TransportAdapter,
};
pub use types::{NowPlaying, RemoteCommand, SessionState, Track};
