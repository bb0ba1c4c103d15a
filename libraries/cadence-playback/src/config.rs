//! Playback configuration
//!
//! Every value is tunable; none of them is a hard invariant of the queue or the
//! state machine.

use crate::error::{PlaybackError, Result};
use crate::types::RepeatMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub clock: ClockSettings,

    /// Past this position, "previous" restarts the current track (default: 3.0)
    #[serde(default = "default_seek_back_threshold_secs")]
    pub seek_back_threshold_secs: f64,

    /// Repeat mode after construction and after `release()` (default: off)
    #[serde(default)]
    pub initial_repeat: RepeatMode,

    /// Capacity of the in-memory history ring (default: 50)
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

/// Queue window and recommendation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Maximum tracks kept before the current one (default: 20)
    pub max_behind: usize,

    /// Minimum tracks shown after the current one in the windowed view (default: 5)
    pub min_ahead: usize,

    /// Maximum tracks kept after the current one (default: 50)
    pub max_ahead: usize,

    /// Recommendations taken per fetch (default: 10)
    pub recommendation_cap: usize,

    /// Recently played tracks are excluded from recommendations (default: 300)
    pub recency_window_secs: u64,

    /// Upcoming tracks included in broadcast session snapshots (default: 10)
    pub view_limit: usize,
}

/// Progress clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    /// Tick interval in milliseconds (default: 500)
    pub tick_interval_ms: u64,

    /// Position/duration changes below this are not broadcast (default: 0.1)
    pub change_epsilon_secs: f64,

    /// A track has ended once `position >= duration - epsilon` (default: 0.5)
    pub end_of_track_epsilon_secs: f64,
}

fn default_seek_back_threshold_secs() -> f64 {
    3.0
}

fn default_history_size() -> usize {
    50
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_behind: 20,
            min_ahead: 5,
            max_ahead: 50,
            recommendation_cap: 10,
            recency_window_secs: 300,
            view_limit: 10,
        }
    }
}

impl QueueSettings {
    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            change_epsilon_secs: 0.1,
            end_of_track_epsilon_secs: 0.5,
        }
    }
}

impl ClockSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            queue: QueueSettings::default(),
            clock: ClockSettings::default(),
            seek_back_threshold_secs: default_seek_back_threshold_secs(),
            initial_repeat: RepeatMode::Off,
            history_size: default_history_size(),
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables are prefixed with `CADENCE_` and use `__` between
    /// section and key, e.g. `CADENCE_QUEUE__MAX_AHEAD=30`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            } else {
                return Err(PlaybackError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let queue = &self.queue;
        if queue.max_ahead == 0 {
            return Err(PlaybackError::Config(
                "queue.max_ahead must be at least 1".to_string(),
            ));
        }
        if queue.min_ahead > queue.max_ahead {
            return Err(PlaybackError::Config(format!(
                "queue.min_ahead ({}) exceeds queue.max_ahead ({})",
                queue.min_ahead, queue.max_ahead
            )));
        }
        if queue.recommendation_cap == 0 {
            return Err(PlaybackError::Config(
                "queue.recommendation_cap must be at least 1".to_string(),
            ));
        }
        if self.clock.tick_interval_ms == 0 {
            return Err(PlaybackError::Config(
                "clock.tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.clock.change_epsilon_secs < 0.0
            || self.clock.end_of_track_epsilon_secs < 0.0
            || self.seek_back_threshold_secs < 0.0
        {
            return Err(PlaybackError::Config(
                "epsilons and thresholds must not be negative".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(PlaybackError::Config(
                "history_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
