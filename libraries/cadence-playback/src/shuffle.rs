//! Shuffle algorithm for queue randomization
//!
//! Pure random (Fisher-Yates) shuffle that pins the playing track to the front,
//! so turning shuffle on never interrupts what is currently heard.

use cadence_core::Track;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `tracks` with `current` moved to index 0
///
/// Every other track has equal probability of landing at any later position.
/// `current` must be a valid index into `tracks`.
pub(crate) fn shuffle_pinned<R: Rng + ?Sized>(
    tracks: &[Track],
    current: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut pool: Vec<Track> = tracks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != current)
        .map(|(_, t)| t.clone())
        .collect();

    // SliceRandom::shuffle is an in-place Fisher-Yates
    pool.shuffle(rng);

    let mut result = Vec::with_capacity(tracks.len());
    result.push(tracks[current].clone());
    result.extend(pool);
    result
}
