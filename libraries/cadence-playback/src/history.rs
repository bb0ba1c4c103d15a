//! Playback history tracking
//!
//! Bounded in-memory record of played tracks, used as the default
//! [`HistoryRecorder`] and for recency filtering of recommendations.

use async_trait::async_trait;
use cadence_core::{HistoryRecorder, Track};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One played track
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub track: Track,
    pub played_secs: f64,
    pub at: Instant,
}

/// Playback history with bounded size
///
/// Ring buffer that discards the oldest entries once full.
#[derive(Debug)]
pub struct InMemoryHistory {
    /// History buffer (most recent = back)
    entries: Mutex<VecDeque<HistoryEntry>>,

    /// Maximum history size
    max_size: usize,
}

impl InMemoryHistory {
    /// Create new history with specified maximum size
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_size)),
            max_size: max_size.max(1),
        }
    }

    /// Add an entry, discarding the oldest if full
    pub fn push(&self, track: Track, played_secs: f64) {
        let mut entries = self.lock();
        if entries.len() >= self.max_size {
            entries.pop_front();
        }
        entries.push_back(HistoryEntry {
            track,
            played_secs,
            at: Instant::now(),
        });
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Get most recent entry
    pub fn last(&self) -> Option<HistoryEntry> {
        self.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Ids played within `window` of now
    pub fn recent_ids(&self, window: Duration) -> HashSet<String> {
        let now = Instant::now();
        self.lock()
            .iter()
            .filter(|e| now.duration_since(e.at) <= window)
            .map(|e| e.track.id().to_string())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<HistoryEntry>> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(50) // Default: 50 tracks
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryHistory {
    async fn record(&self, track: &Track, played_secs: f64) -> cadence_core::Result<()> {
        self.push(track.clone(), played_secs);
        Ok(())
    }

    async fn recently_played_ids(&self, window: Duration) -> cadence_core::Result<HashSet<String>> {
        Ok(self.recent_ids(window))
    }
}
