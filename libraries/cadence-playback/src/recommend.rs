//! Recommendation prefetch policy
//!
//! Fetching is async and happens outside the controller lock; filtering is a
//! pure function over value snapshots so the queue never transiently holds a
//! duplicate.

use cadence_core::{HistoryRecorder, RecommendationSource, Track};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw recommendations plus the recent-history snapshot to filter them against
#[derive(Debug, Clone, Default)]
pub struct RecommendationBatch {
    pub tracks: Vec<Track>,
    pub recent_ids: HashSet<String>,
}

impl RecommendationBatch {
    pub fn new(tracks: Vec<Track>, recent_ids: HashSet<String>) -> Self {
        Self { tracks, recent_ids }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Drop recently played, already queued, and repeated ids, then cap
pub fn filter_recommendations(
    batch: Vec<Track>,
    recent: &HashSet<String>,
    queued: &HashSet<String>,
    cap: usize,
) -> Vec<Track> {
    let mut seen: HashSet<String> = HashSet::new();

    batch
        .into_iter()
        .filter(|t| !recent.contains(t.id()) && !queued.contains(t.id()))
        .filter(|t| seen.insert(t.id().to_string()))
        .take(cap)
        .collect()
}

/// Fetch recommendations and the recent-history set concurrently
///
/// Failures of either collaborator are logged and degrade to empty results:
/// an empty batch only means the queue stops growing.
pub async fn fetch_batch(
    source: &dyn RecommendationSource,
    history: &dyn HistoryRecorder,
    seed_id: &str,
    recency_window: Duration,
) -> RecommendationBatch {
    let (tracks, recent) = tokio::join!(
        source.fetch(seed_id),
        history.recently_played_ids(recency_window)
    );

    let tracks = tracks.unwrap_or_else(|e| {
        warn!("Recommendation fetch for {} failed: {}", seed_id, e);
        Vec::new()
    });
    let recent_ids = recent.unwrap_or_else(|e| {
        warn!("Failed to read recent history: {}", e);
        HashSet::new()
    });

    debug!(
        "Fetched {} recommendations for {} ({} recently played)",
        tracks.len(),
        seed_id,
        recent_ids.len()
    );

    RecommendationBatch::new(tracks, recent_ids)
}
