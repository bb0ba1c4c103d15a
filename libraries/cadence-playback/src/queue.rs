//! Windowed, shuffle-aware play queue
//!
//! A single live sequence with a current position:
//! ```text
//!   ... up to max_behind played tracks ...
//! ─────────────────────────────
//! Current: Track C            <- current_index
//! ─────────────────────────────
//!   recommendations land here (play next)
//!   ... up to max_ahead upcoming tracks ...
//! ```
//!
//! The queue performs no I/O. Recommendation batches are fetched by the
//! controller and handed in as values (see [`crate::recommend`]).

use crate::config::QueueSettings;
use crate::recommend::{filter_recommendations, RecommendationBatch};
use crate::shuffle::shuffle_pinned;
use crate::types::{RepeatMode, WindowedQueue};
use cadence_core::Track;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::debug;

/// Ordered play sequence with windowing, shuffle and repeat
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// Live play order
    tracks: Vec<Track>,

    /// Index of the current track (`None` iff `tracks` is empty)
    current: Option<usize>,

    /// Pre-shuffle order, present only while shuffled
    original: Option<Vec<Track>>,

    repeat: RepeatMode,
    initial_repeat: RepeatMode,
    settings: QueueSettings,
    rng: StdRng,
}

impl QueueManager {
    /// Create an empty queue
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            original: None,
            repeat: RepeatMode::Off,
            initial_repeat: RepeatMode::Off,
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Repeat mode used after construction and after [`clear`](Self::clear)
    #[must_use]
    pub fn with_initial_repeat(mut self, mode: RepeatMode) -> Self {
        self.repeat = mode;
        self.initial_repeat = mode;
        self
    }

    /// Seed the shuffle RNG (reproducible shuffles in tests)
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Replace the live sequence
    ///
    /// With an explicit list (e.g. "play this album") the sequence becomes that
    /// list, ids de-duplicated with the first occurrence kept. The start
    /// position is `start_index` when valid, else the position of `seed`, else
    /// 0. Without a list the sequence is just `[seed]`; use
    /// [`extend`](Self::extend) to grow it.
    ///
    /// Resets shuffle. Returns the track now current.
    pub fn establish(
        &mut self,
        seed: Track,
        explicit: Option<Vec<Track>>,
        start_index: Option<usize>,
    ) -> Option<Track> {
        let (tracks, current) = match explicit {
            Some(list) if !list.is_empty() => {
                let start_id = start_index
                    .and_then(|i| list.get(i))
                    .map(|t| t.id().to_string())
                    .unwrap_or_else(|| seed.id().to_string());

                let mut seen = HashSet::new();
                let tracks: Vec<Track> = list
                    .into_iter()
                    .filter(|t| seen.insert(t.id().to_string()))
                    .collect();
                let current = tracks.iter().position(|t| t.id() == start_id).unwrap_or(0);
                (tracks, current)
            }
            _ => (vec![seed], 0),
        };

        debug!(
            "Queue established with {} tracks, starting at {}",
            tracks.len(),
            current
        );

        self.tracks = tracks;
        self.current = Some(current);
        self.original = None;
        self.apply_window();
        self.current()
    }

    /// `[seed, ...filtered recommendations]`
    ///
    /// Returns the recommendations that made it into the queue.
    pub fn establish_with_recommendations(
        &mut self,
        seed: Track,
        batch: RecommendationBatch,
    ) -> Vec<Track> {
        self.establish(seed, None, None);
        self.extend(batch)
    }

    /// Insert fresh recommendations directly after the current track
    ///
    /// The batch is filtered against its recent-history snapshot and every id
    /// already queued (live order and pre-shuffle order), then capped.
    /// Returns what was actually inserted; empty means no more material, not
    /// an error.
    pub fn extend(&mut self, batch: RecommendationBatch) -> Vec<Track> {
        let queued = self.queued_ids();
        let fresh = filter_recommendations(
            batch.tracks,
            &batch.recent_ids,
            &queued,
            self.settings.recommendation_cap,
        );

        if fresh.is_empty() {
            debug!("Extension produced no new tracks");
            return fresh;
        }

        match self.current {
            None => {
                self.tracks = fresh.clone();
                self.current = Some(0);
                self.original = None;
            }
            Some(idx) => {
                let at = idx + 1;
                self.tracks.splice(at..at, fresh.iter().cloned());

                let current_id = self.tracks[idx].id().to_string();
                if let Some(original) = self.original.as_mut() {
                    let pos = original
                        .iter()
                        .position(|t| t.id() == current_id)
                        .map_or(original.len(), |p| p + 1);
                    original.splice(pos..pos, fresh.iter().cloned());
                }
            }
        }

        self.apply_window();

        let inserted: Vec<Track> = fresh
            .into_iter()
            .filter(|t| self.tracks.contains(t))
            .collect();
        debug!("Extended queue with {} tracks", inserted.len());
        inserted
    }

    /// Advance to the next track
    ///
    /// Repeat one keeps the current track; at the end, repeat all wraps to the
    /// first track and repeat off returns `None` without moving.
    pub fn next(&mut self) -> Option<Track> {
        let idx = self.current?;

        let next = match self.repeat {
            RepeatMode::One => return self.current(),
            _ if idx + 1 < self.tracks.len() => idx + 1,
            RepeatMode::All => 0,
            RepeatMode::Off => return None,
        };

        self.current = Some(next);
        self.apply_window();
        self.current()
    }

    /// Step back to the previous track
    ///
    /// At the start (repeat off) this returns the current track, meaning
    /// "restart it".
    pub fn previous(&mut self) -> Option<Track> {
        let idx = self.current?;

        let prev = match self.repeat {
            RepeatMode::One => return self.current(),
            _ if idx > 0 => idx - 1,
            RepeatMode::All => self.tracks.len() - 1,
            RepeatMode::Off => return self.current(),
        };

        self.current = Some(prev);
        self.apply_window();
        self.current()
    }

    /// Make the track at `index` current; out of range is a no-op
    pub fn jump_to(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }

        self.current = Some(index);
        self.apply_window();
        self.current()
    }

    /// Toggle shuffle, returning the new state
    ///
    /// Shuffling pins the current track at index 0; unshuffling restores the
    /// pre-shuffle order and finds the current track in it again. An empty
    /// queue has nothing to shuffle and stays unshuffled.
    pub fn toggle_shuffle(&mut self) -> bool {
        if let Some(original) = self.original.take() {
            let current_id = self.current().map(|t| t.id().to_string());
            self.current = if original.is_empty() {
                None
            } else {
                Some(
                    current_id
                        .and_then(|id| original.iter().position(|t| t.id() == id))
                        .unwrap_or(0),
                )
            };
            self.tracks = original;
            self.apply_window();
            debug!("Shuffle disabled");
            return false;
        }

        let Some(idx) = self.current else {
            return false;
        };
        self.original = Some(self.tracks.clone());
        self.tracks = shuffle_pinned(&self.tracks, idx, &mut self.rng);
        self.current = Some(0);
        self.apply_window();
        debug!("Shuffle enabled");
        true
    }

    /// Rotate `off -> all -> one -> off`
    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycled();
        self.repeat
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn is_shuffled(&self) -> bool {
        self.original.is_some()
    }

    /// Bounded slice around the current track for display
    ///
    /// At most `max_behind` tracks before; after, `limit` clamped to
    /// `[min_ahead, max_ahead]` (default `max_ahead`), capped by what exists.
    pub fn windowed_view(&self, limit: Option<usize>) -> WindowedQueue {
        let Some(idx) = self.current else {
            return WindowedQueue::default();
        };

        let behind = idx.min(self.settings.max_behind);
        let ahead_limit = limit
            .unwrap_or(self.settings.max_ahead)
            .max(self.settings.min_ahead)
            .min(self.settings.max_ahead);
        let ahead = (self.tracks.len() - 1 - idx).min(ahead_limit);

        WindowedQueue {
            tracks: self.tracks[idx - behind..=idx + ahead].to_vec(),
            relative_index: Some(behind),
        }
    }

    /// Empty the queue and reset shuffle and repeat
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
        self.original = None;
        self.repeat = self.initial_repeat;
    }

    /// Append to the end of the queue
    ///
    /// Returns `false` if the track is already queued or the queue is full.
    pub fn add_to_end(&mut self, track: Track) -> bool {
        if self.contains(track.id()) {
            return false;
        }

        let id = track.id().to_string();
        if self.current.is_none() {
            self.tracks = vec![track];
            self.current = Some(0);
            self.original = None;
            return true;
        }

        if let Some(original) = self.original.as_mut() {
            original.push(track.clone());
        }
        self.tracks.push(track);
        self.apply_window();

        if self.tracks.iter().any(|t| t.id() == id) {
            true
        } else {
            // Trimmed straight back off the tail
            if let Some(original) = self.original.as_mut() {
                original.retain(|t| t.id() != id);
            }
            false
        }
    }

    /// Insert directly after the current track
    ///
    /// An already queued track is moved rather than duplicated. Returns
    /// `false` if the track is the current one.
    pub fn add_next(&mut self, track: Track) -> bool {
        let Some(idx) = self.current else {
            return self.add_to_end(track);
        };

        if self.tracks[idx] == track {
            return false;
        }

        let current_id = self.tracks[idx].id().to_string();

        let mut idx = idx;
        if let Some(pos) = self.tracks.iter().position(|t| *t == track) {
            self.tracks.remove(pos);
            if pos < idx {
                idx -= 1;
            }
        }
        self.tracks.insert(idx + 1, track.clone());
        self.current = Some(idx);

        if let Some(original) = self.original.as_mut() {
            original.retain(|t| *t != track);
            let pos = original
                .iter()
                .position(|t| t.id() == current_id)
                .map_or(original.len(), |p| p + 1);
            original.insert(pos, track);
        }

        self.apply_window();
        true
    }

    /// Remove the track at `index`; the current track cannot be removed
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        let idx = self.current?;
        if index == idx || index >= self.tracks.len() {
            return None;
        }

        let track = self.tracks.remove(index);
        if index < idx {
            self.current = Some(idx - 1);
        }
        if let Some(original) = self.original.as_mut() {
            original.retain(|t| *t != track);
        }
        Some(track)
    }

    pub fn current(&self) -> Option<Track> {
        self.current.and_then(|i| self.tracks.get(i)).cloned()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Whether the current track is the last one
    pub fn is_at_end(&self) -> bool {
        self.current.is_some_and(|i| i + 1 == self.tracks.len())
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Live play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Order to restore when shuffle is turned off (the live order if not shuffled)
    pub fn original_order(&self) -> &[Track] {
        self.original.as_deref().unwrap_or(&self.tracks)
    }

    /// Whether `id` is queued anywhere, including tracks only kept for unshuffle
    pub fn contains(&self, id: &str) -> bool {
        self.tracks.iter().any(|t| t.id() == id)
            || self
                .original
                .as_ref()
                .is_some_and(|o| o.iter().any(|t| t.id() == id))
    }

    /// Snapshot of every queued id, for de-duplicating recommendations
    pub fn queued_ids(&self) -> HashSet<String> {
        self.tracks
            .iter()
            .chain(self.original.iter().flatten())
            .map(|t| t.id().to_string())
            .collect()
    }

    /// Trim to at most `max_ahead` after and `max_behind` before the current track
    ///
    /// Only the live sequence is trimmed; while shuffled, the pre-shuffle order
    /// keeps everything so unshuffling is lossless.
    fn apply_window(&mut self) {
        let Some(idx) = self.current else {
            return;
        };

        let keep_until = idx + 1 + self.settings.max_ahead;
        if self.tracks.len() > keep_until {
            debug!("Trimming {} tracks from queue tail", self.tracks.len() - keep_until);
            self.tracks.truncate(keep_until);
        }

        if idx > self.settings.max_behind {
            let excess = idx - self.settings.max_behind;
            debug!("Trimming {} played tracks from queue head", excess);
            self.tracks.drain(..excess);
            self.current = Some(idx - excess);
        }
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new(QueueSettings::default())
    }
}
