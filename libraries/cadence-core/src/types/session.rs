/// Types exchanged with the session store and the OS media controls
use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Persisted playback position, restored across process restarts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Track that was loaded
    pub track: Track,

    /// Position within the track in seconds
    pub position_secs: f64,
}

/// Metadata pushed to lock-screen / notification controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    /// Track duration in seconds (0 until the transport reports it)
    pub duration_secs: f64,
}

impl NowPlaying {
    /// Build now-playing metadata for a track
    pub fn for_track(track: &Track, duration_secs: f64) -> Self {
        Self {
            track_id: track.id().to_string(),
            title: track.title().to_string(),
            artist: track.artist_line(),
            album: track.album_title().map(str::to_string),
            artwork_url: track.artwork_url().map(str::to_string),
            duration_secs,
        }
    }
}

/// Command delivered by external media controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "position", rename_all = "lowercase")]
pub enum RemoteCommand {
    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Toggle between play and pause (headset button)
    Toggle,

    /// Skip to next track
    Next,

    /// Go to previous track
    Previous,

    /// Seek to position (in seconds)
    Seek(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_playing_flattens_artists() {
        let track = Track::new("t1", "Archangel")
            .unwrap()
            .with_artists(["Burial"])
            .with_album("Untrue");

        let np = NowPlaying::for_track(&track, 238.0);
        assert_eq!(np.artist, "Burial");
        assert_eq!(np.album.as_deref(), Some("Untrue"));
        assert_eq!(np.duration_secs, 238.0);
    }

    #[test]
    fn remote_command_wire_format() {
        let json = serde_json::to_string(&RemoteCommand::Seek(12.5)).unwrap();
        assert_eq!(json, r#"{"command":"seek","position":12.5}"#);

        let cmd: RemoteCommand = serde_json::from_str(r#"{"command":"next"}"#).unwrap();
        assert_eq!(cmd, RemoteCommand::Next);
    }
}
