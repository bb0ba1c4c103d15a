//! Session broadcasts
//!
//! Every state change sends a full [`PlaybackSession`] snapshot to each
//! subscriber, in mutation order. Snapshots are never coalesced, so a
//! subscriber observes every intermediate `loading` state.

use crate::types::PlaybackSession;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::debug;

type Listeners = Mutex<Vec<(u64, mpsc::UnboundedSender<PlaybackSession>)>>;

/// Registry of session subscribers
#[derive(Debug, Default)]
pub(crate) struct SessionBroadcaster {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl SessionBroadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub(crate) fn subscribe(&self) -> SessionSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, tx));
        debug!("Session subscriber {} registered", id);

        SessionSubscription {
            id,
            rx,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Send a snapshot to every live subscriber, pruning closed ones
    pub(crate) fn emit(&self, session: &PlaybackSession) {
        lock(&self.listeners).retain(|(_, tx)| tx.send(session.clone()).is_ok());
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

/// Receiving end of a session subscription
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<PlaybackSession>,
    listeners: Weak<Listeners>,
}

impl SessionSubscription {
    /// Wait for the next snapshot
    ///
    /// Returns `None` once the controller is gone.
    pub async fn recv(&mut self) -> Option<PlaybackSession> {
        self.rx.recv().await
    }

    /// Take a snapshot that is already queued, without waiting
    pub fn try_recv(&mut self) -> Option<PlaybackSession> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued snapshot
    pub fn drain(&mut self) -> Vec<PlaybackSession> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Stop receiving updates
    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(listeners: &Listeners) -> MutexGuard<'_, Vec<(u64, mpsc::UnboundedSender<PlaybackSession>)>> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}
