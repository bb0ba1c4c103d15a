//! Playback controller
//!
//! Owns the queue, the playback session and the single transport instance.
//!
//! Every entry point (caller, progress clock, remote command) mutates state
//! under one async lock and releases it before awaiting a collaborator.
//! Entry points that start transport work take a new *generation*; an await
//! that resolves for an older generation is discarded instead of applied.
//!
//! ```text
//!            play_track / play_next / play_previous
//!  Idle ─────────────────────┐
//!  Paused ───────────────────┼──> Loading ──ok──> Playing <──play── Paused
//!  Error ────────────────────┘       │              │  └──pause──────^
//!                                    └──err──> Error└──end of queue──> Idle
//! ```

use crate::clock;
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::events::{SessionBroadcaster, SessionSubscription};
use crate::history::InMemoryHistory;
use crate::queue::QueueManager;
use crate::recommend::fetch_batch;
use crate::remote;
use crate::types::{PlaybackSession, PlaybackStatus, RepeatMode, WindowedQueue};
use cadence_core::{
    HistoryRecorder, NowPlaying, RecommendationSource, RemoteControl, SessionState,
    SessionStateStore, StreamResolver, Track, TransportAdapter,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// External services the controller drives
pub struct Collaborators {
    pub recommendations: Arc<dyn RecommendationSource>,

    /// `None` uses an [`InMemoryHistory`] sized by `history_size`
    pub history: Option<Arc<dyn HistoryRecorder>>,

    pub resolver: Arc<dyn StreamResolver>,

    /// Exclusively owned by the controller; nothing else should command it
    pub transport: Arc<dyn TransportAdapter>,

    pub session_store: Arc<dyn SessionStateStore>,

    pub remote: RemoteControl,
}

/// Mutable state, only touched under `Inner::state`
pub(crate) struct State {
    pub(crate) queue: QueueManager,
    pub(crate) session: PlaybackSession,

    /// Running progress clock, if any
    pub(crate) clock: Option<JoinHandle<()>>,

    /// A stream is loaded into the transport
    pub(crate) transport_loaded: bool,

    pub(crate) last_saved_position: Option<f64>,
    pub(crate) last_now_playing: Option<NowPlaying>,
}

pub(crate) struct Inner {
    pub(crate) config: PlaybackConfig,
    pub(crate) state: Mutex<State>,

    /// Bumped by every entry point that starts transport work
    pub(crate) generation: AtomicU64,

    /// Bumped whenever the clock is started or stopped
    pub(crate) clock_epoch: AtomicU64,

    /// Serializes transport commands
    pub(crate) transport_guard: Mutex<()>,

    pub(crate) broadcaster: SessionBroadcaster,
    pub(crate) recommendations: Arc<dyn RecommendationSource>,
    pub(crate) history: Arc<dyn HistoryRecorder>,
    pub(crate) resolver: Arc<dyn StreamResolver>,
    pub(crate) transport: Arc<dyn TransportAdapter>,
    pub(crate) session_store: Arc<dyn SessionStateStore>,
    pub(crate) remote: RemoteControl,
    pub(crate) remote_pump: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().clock.take() {
            handle.abort();
        }
        if let Ok(pump) = self.remote_pump.get_mut() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

/// Queue and playback state machine
///
/// Cheap to clone; clones share the same controller.
#[derive(Clone)]
pub struct PlaybackController {
    pub(crate) inner: Arc<Inner>,
}

/// What `play_next` found after the queue moved
enum Step {
    Load(Track),
    EndOfQueue,
}

/// A track left while playing or paused, not yet written to history
struct Departure {
    track: Track,
    played_secs: f64,
}

impl PlaybackController {
    /// Create a controller and wire remote commands, if available
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns `Config` if the configuration is inconsistent and
    /// `InvalidOperation` outside a Tokio runtime.
    pub fn new(config: PlaybackConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| {
            PlaybackError::InvalidOperation("controller requires a Tokio runtime".to_string())
        })?;

        let history = collaborators.history.unwrap_or_else(|| {
            Arc::new(InMemoryHistory::new(config.history_size)) as Arc<dyn HistoryRecorder>
        });

        let queue = QueueManager::new(config.queue.clone()).with_initial_repeat(config.initial_repeat);
        let session = PlaybackSession {
            repeat_mode: config.initial_repeat,
            ..PlaybackSession::default()
        };

        let controller = Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    queue,
                    session,
                    clock: None,
                    transport_loaded: false,
                    last_saved_position: None,
                    last_now_playing: None,
                }),
                generation: AtomicU64::new(0),
                clock_epoch: AtomicU64::new(0),
                transport_guard: Mutex::new(()),
                broadcaster: SessionBroadcaster::new(),
                recommendations: collaborators.recommendations,
                history,
                resolver: collaborators.resolver,
                transport: collaborators.transport,
                session_store: collaborators.session_store,
                remote: collaborators.remote,
                remote_pump: std::sync::Mutex::new(None),
            }),
        };

        if let Some(pump) = remote::attach(&controller) {
            if let Ok(mut slot) = controller.inner.remote_pump.lock() {
                *slot = Some(pump);
            }
        }

        Ok(controller)
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    /// Play a track, optionally with an explicit queue
    ///
    /// Without a queue, recommendations seeded from `track` are fetched
    /// alongside stream resolution and inserted after it. A later call
    /// supersedes this one: if it lands first, this call's results are
    /// dropped.
    ///
    /// # Errors
    /// Resolution and transport failures; the session is left in `Error`
    /// with `last_error` set and the attempted track as `current_track`.
    pub async fn play_track(
        &self,
        track: Track,
        queue: Option<Vec<Track>>,
        start_index: Option<usize>,
    ) -> Result<()> {
        let explicit = queue.as_ref().is_some_and(|q| !q.is_empty());

        let (generation, target, departed) = {
            let mut state = self.inner.state.lock().await;
            let generation = self.next_generation();
            let departed = self.leave_track(&mut state);

            let target = state
                .queue
                .establish(track.clone(), queue, start_index)
                .unwrap_or(track);
            self.begin_load(&mut state, &target);
            (generation, target, departed)
        };

        info!("Playing {} ({})", target.title(), target.id());

        if explicit {
            let ((), loaded) = tokio::join!(
                self.record_departure(departed),
                self.finish_load(generation, target, None, true)
            );
            return loaded;
        }

        // The outgoing track must be in history before recent ids are read
        let departed_id = departed.as_ref().map(|d| d.track.id().to_string());
        let (mut batch, url) = tokio::join!(
            async {
                self.record_departure(departed).await;
                fetch_batch(
                    self.inner.recommendations.as_ref(),
                    self.inner.history.as_ref(),
                    target.id(),
                    self.inner.config.queue.recency_window(),
                )
                .await
            },
            self.inner.resolver.resolve(&target)
        );
        batch.recent_ids.extend(departed_id);

        {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                debug!("Discarding recommendations for superseded {}", target.id());
                return Ok(());
            }
            let added = state.queue.extend(batch);
            if !added.is_empty() {
                self.emit(&mut state);
            }
        }

        match url {
            Ok(url) => self.load_and_play(generation, &target, &url, None, true).await,
            Err(e) => {
                self.fail(generation, PlaybackError::resolution(target.title(), e))
                    .await
            }
        }
    }

    /// Resume, or load the current track when nothing is loaded
    ///
    /// # Errors
    /// `NoTrackLoaded` when there is nothing to play, plus load failures.
    pub async fn play(&self) -> Result<()> {
        let (generation, reload) = {
            let mut state = self.inner.state.lock().await;
            match state.session.status {
                PlaybackStatus::Playing | PlaybackStatus::Loading => return Ok(()),
                PlaybackStatus::Paused if state.transport_loaded => {
                    (self.next_generation(), None)
                }
                _ => {
                    let track = state
                        .session
                        .current_track
                        .clone()
                        .or_else(|| state.queue.current())
                        .ok_or(PlaybackError::NoTrackLoaded)?;
                    let generation = self.next_generation();
                    self.begin_load(&mut state, &track);
                    (generation, Some(track))
                }
            }
        };

        if let Some(track) = reload {
            return self.finish_load(generation, track, None, true).await;
        }

        let resumed = {
            let _guard = self.inner.transport_guard.lock().await;
            if !self.is_current(generation) {
                return Ok(());
            }
            self.inner.transport.play().await
        };
        if let Err(e) = resumed {
            return self
                .fail(generation, PlaybackError::transport("resume", e))
                .await;
        }

        let (now_playing, position) = {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                return Ok(());
            }
            self.set_status(&mut state, PlaybackStatus::Playing);
            self.start_clock(&mut state);
            self.emit(&mut state);
            (self.now_playing(&mut state), state.session.position_secs)
        };

        debug!("Resumed playback at {:.1}s", position);
        self.push_remote(now_playing, true, position).await;
        Ok(())
    }

    /// Pause playback and persist the session
    ///
    /// No-op unless playing.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn pause(&self) -> Result<()> {
        let (generation, saved) = {
            let mut state = self.inner.state.lock().await;
            if state.session.status != PlaybackStatus::Playing {
                return Ok(());
            }
            self.set_status(&mut state, PlaybackStatus::Paused);
            self.emit(&mut state);

            let saved = state.session.current_track.clone().map(|track| SessionState {
                track,
                position_secs: state.session.position_secs,
            });
            if let Some(s) = &saved {
                state.last_saved_position = Some(s.position_secs);
            }
            (self.inner.generation.load(Ordering::SeqCst), saved)
        };

        let paused = {
            let _guard = self.inner.transport_guard.lock().await;
            self.inner.transport.pause().await
        };
        if let Err(e) = paused {
            return self.fail(generation, PlaybackError::transport("pause", e)).await;
        }

        if let Some(saved) = saved {
            self.persist(&saved).await;
            self.push_remote(None, false, saved.position_secs).await;
        }
        debug!("Paused");
        Ok(())
    }

    /// Pause when playing, play otherwise
    ///
    /// # Errors
    /// As [`play`](Self::play) / [`pause`](Self::pause).
    pub async fn toggle_play_pause(&self) -> Result<()> {
        let playing = self.inner.state.lock().await.session.status == PlaybackStatus::Playing;
        if playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Skip to the next track
    ///
    /// On the last track with repeat off, the queue is first extended with
    /// recommendations seeded from the current track. If nothing follows,
    /// the controller goes idle.
    ///
    /// # Errors
    /// `NoTrackLoaded` on an empty queue, plus load failures.
    pub async fn play_next(&self) -> Result<()> {
        self.advance(None).await
    }

    /// Advance after the progress clock saw the track end
    ///
    /// Does nothing if another command took over or playback stopped since
    /// the end was detected at `generation`.
    pub(crate) async fn advance_after_track_end(&self, generation: u64) -> Result<()> {
        self.advance(Some(generation)).await
    }

    async fn advance(&self, ended_at: Option<u64>) -> Result<()> {
        let (generation, seed, departed) = {
            let mut state = self.inner.state.lock().await;
            if let Some(ended_at) = ended_at {
                if !self.is_current(ended_at) || state.session.status != PlaybackStatus::Playing {
                    debug!("Track end overtaken by another command, not advancing");
                    return Ok(());
                }
            }

            let current = state.queue.current().ok_or(PlaybackError::NoTrackLoaded)?;
            let generation = self.next_generation();
            let departed = self.leave_track(&mut state);

            // Under repeat all or one the end of the queue is never declared
            if !(state.queue.is_at_end() && state.queue.repeat_mode() == RepeatMode::Off) {
                let step = self.step_forward(&mut state);
                drop(state);
                let ((), stepped) = tokio::join!(
                    self.record_departure(departed),
                    self.after_step(generation, step)
                );
                return stepped;
            }

            self.set_status(&mut state, PlaybackStatus::Loading);
            self.emit(&mut state);
            (generation, current, departed)
        };

        self.record_departure(departed).await;
        debug!("End of queue reached, extending from {}", seed.id());
        let batch = fetch_batch(
            self.inner.recommendations.as_ref(),
            self.inner.history.as_ref(),
            seed.id(),
            self.inner.config.queue.recency_window(),
        )
        .await;

        let step = {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                debug!("Discarding extension for superseded advance");
                return Ok(());
            }
            state.queue.extend(batch);
            self.step_forward(&mut state)
        };
        self.after_step(generation, step).await
    }

    /// Go back, or restart the current track
    ///
    /// Past `seek_back_threshold_secs` into a track this is a seek to zero.
    ///
    /// # Errors
    /// `NoTrackLoaded` on an empty queue, plus transport failures.
    pub async fn play_previous(&self) -> Result<()> {
        let (generation, track, departed) = {
            let mut state = self.inner.state.lock().await;
            if state.queue.is_empty() {
                return Err(PlaybackError::NoTrackLoaded);
            }

            let active = matches!(
                state.session.status,
                PlaybackStatus::Playing | PlaybackStatus::Paused
            );
            if active && state.session.position_secs > self.inner.config.seek_back_threshold_secs
            {
                drop(state);
                return self.seek_to(0.0).await;
            }

            let before = state.queue.current().map(|t| t.id().to_string());
            let track = state.queue.previous().ok_or(PlaybackError::NoTrackLoaded)?;
            if active && before.as_deref() == Some(track.id()) {
                drop(state);
                return self.seek_to(0.0).await;
            }

            let generation = self.next_generation();
            let departed = self.leave_track(&mut state);
            self.begin_load(&mut state, &track);
            (generation, track, departed)
        };

        let ((), loaded) = tokio::join!(
            self.record_departure(departed),
            self.finish_load(generation, track, None, true)
        );
        loaded
    }

    /// Seek within the current track
    ///
    /// The position is clamped to the track and applied optimistically.
    ///
    /// # Errors
    /// `NoTrackLoaded` unless playing or paused, plus transport failures.
    pub async fn seek_to(&self, position_secs: f64) -> Result<()> {
        let (generation, position, playing) = {
            let mut state = self.inner.state.lock().await;
            let playing = match state.session.status {
                PlaybackStatus::Playing => true,
                PlaybackStatus::Paused => false,
                _ => return Err(PlaybackError::NoTrackLoaded),
            };

            let mut position = position_secs.max(0.0);
            if state.session.duration_secs > 0.0 {
                position = position.min(state.session.duration_secs);
            }
            state.session.position_secs = position;
            self.emit(&mut state);
            (self.inner.generation.load(Ordering::SeqCst), position, playing)
        };

        let sought = {
            let _guard = self.inner.transport_guard.lock().await;
            self.inner.transport.seek(position).await
        };
        if let Err(e) = sought {
            return self.fail(generation, PlaybackError::transport("seek", e)).await;
        }

        self.push_remote(None, playing, position).await;
        Ok(())
    }

    /// Toggle shuffle, returning the new state
    pub async fn toggle_shuffle(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        let shuffled = state.queue.toggle_shuffle();
        self.emit(&mut state);
        shuffled
    }

    /// Rotate `off -> all -> one -> off`
    pub async fn cycle_repeat_mode(&self) -> RepeatMode {
        let mut state = self.inner.state.lock().await;
        let mode = state.queue.cycle_repeat_mode();
        self.emit(&mut state);
        mode
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        let mut state = self.inner.state.lock().await;
        state.queue.set_repeat_mode(mode);
        self.emit(&mut state);
    }

    /// Append a track to the queue; `false` if already queued or full
    pub async fn add_to_queue(&self, track: Track) -> bool {
        let mut state = self.inner.state.lock().await;
        let added = state.queue.add_to_end(track);
        if added {
            self.emit(&mut state);
        }
        added
    }

    /// Queue a track to play right after the current one
    ///
    /// A track that is already queued is moved.
    pub async fn add_next_in_queue(&self, track: Track) -> bool {
        let mut state = self.inner.state.lock().await;
        let added = state.queue.add_next(track);
        if added {
            self.emit(&mut state);
        }
        added
    }

    /// Jump to a queue position and play it
    ///
    /// # Errors
    /// `IndexOutOfBounds` for an invalid index, plus load failures.
    pub async fn play_queue_index(&self, index: usize) -> Result<()> {
        let (generation, track, departed) = {
            let mut state = self.inner.state.lock().await;
            if index >= state.queue.len() {
                return Err(PlaybackError::IndexOutOfBounds(index));
            }
            let generation = self.next_generation();
            let departed = self.leave_track(&mut state);
            let track = state
                .queue
                .jump_to(index)
                .ok_or(PlaybackError::IndexOutOfBounds(index))?;
            self.begin_load(&mut state, &track);
            (generation, track, departed)
        };

        let ((), loaded) = tokio::join!(
            self.record_departure(departed),
            self.finish_load(generation, track, None, true)
        );
        loaded
    }

    /// Remove a queued track by position
    ///
    /// # Errors
    /// `InvalidOperation` for the current track, `IndexOutOfBounds` otherwise.
    pub async fn remove_from_queue(&self, index: usize) -> Result<Track> {
        let mut state = self.inner.state.lock().await;
        if state.queue.current_index() == Some(index) {
            return Err(PlaybackError::InvalidOperation(
                "cannot remove the current track".to_string(),
            ));
        }
        let removed = state
            .queue
            .remove(index)
            .ok_or(PlaybackError::IndexOutOfBounds(index))?;
        self.emit(&mut state);
        Ok(removed)
    }

    /// Bounded queue slice around the current track
    pub async fn get_windowed_queue(&self, limit: Option<usize>) -> WindowedQueue {
        self.inner.state.lock().await.queue.windowed_view(limit)
    }

    /// Receive a session snapshot on every change
    pub fn subscribe(&self) -> SessionSubscription {
        self.inner.broadcaster.subscribe()
    }

    pub async fn snapshot(&self) -> PlaybackSession {
        self.inner.state.lock().await.session.clone()
    }

    /// Whether the progress clock is running
    pub async fn clock_running(&self) -> bool {
        self.inner.state.lock().await.clock.is_some()
    }

    /// Reload the last persisted session, paused at the saved position
    ///
    /// Only acts when idle. Returns whether a session was restored.
    ///
    /// # Errors
    /// Resolution and transport failures while loading the saved track.
    pub async fn restore_session(&self) -> Result<bool> {
        let saved = match self.inner.session_store.load().await {
            Ok(Some(saved)) => saved,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("Failed to load saved session: {}", e);
                return Ok(false);
            }
        };

        let generation = {
            let mut state = self.inner.state.lock().await;
            if state.session.status != PlaybackStatus::Idle {
                return Ok(false);
            }
            let generation = self.next_generation();
            state.queue.establish(saved.track.clone(), None, None);
            self.begin_load(&mut state, &saved.track);
            generation
        };

        info!(
            "Restoring {} at {:.1}s",
            saved.track.id(),
            saved.position_secs
        );
        self.finish_load(generation, saved.track, Some(saved.position_secs), false)
            .await?;
        Ok(self.is_current(generation))
    }

    /// Stop everything and return to idle
    ///
    /// Safe to call repeatedly and while a load is in flight; late results
    /// are ignored.
    pub async fn release(&self) {
        let (unload, departed) = {
            let mut state = self.inner.state.lock().await;
            self.next_generation();
            let departed = self.leave_track(&mut state);
            self.stop_clock(&mut state);

            let reset = PlaybackSession {
                repeat_mode: self.inner.config.initial_repeat,
                ..PlaybackSession::default()
            };
            let changed = state.session != reset || !state.queue.is_empty();
            let unload = std::mem::take(&mut state.transport_loaded)
                || state.session.status == PlaybackStatus::Loading;

            state.queue.clear();
            state.session = reset;
            state.last_saved_position = None;
            state.last_now_playing = None;
            if changed {
                self.emit(&mut state);
            }
            (unload, departed)
        };

        self.record_departure(departed).await;

        if unload {
            let _guard = self.inner.transport_guard.lock().await;
            if let Err(e) = self.inner.transport.release().await {
                warn!("Transport release failed: {}", e);
            }
        }
        debug!("Controller released");
    }

    // ---- internals ----

    pub(crate) fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    /// Broadcast the session with a fresh queue view
    pub(crate) fn emit(&self, state: &mut State) {
        state.session.queue = state
            .queue
            .windowed_view(Some(self.inner.config.queue.view_limit));
        state.session.shuffled = state.queue.is_shuffled();
        state.session.repeat_mode = state.queue.repeat_mode();
        self.inner.broadcaster.emit(&state.session);
    }

    /// Change status; leaving `Playing` always stops the clock
    pub(crate) fn set_status(&self, state: &mut State, status: PlaybackStatus) {
        if status != PlaybackStatus::Playing {
            self.stop_clock(state);
        }
        state.session.status = status;
    }

    pub(crate) fn start_clock(&self, state: &mut State) {
        if let Some(handle) = state.clock.take() {
            handle.abort();
        }
        let epoch = self.inner.clock_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let period = self.inner.config.clock.tick_interval();
        state.clock = Some(clock::spawn(self, epoch, period));
    }

    pub(crate) fn stop_clock(&self, state: &mut State) {
        if let Some(handle) = state.clock.take() {
            self.inner.clock_epoch.fetch_add(1, Ordering::SeqCst);
            handle.abort();
        }
    }

    /// Snapshot the outgoing track if it was actually played
    fn leave_track(&self, state: &mut State) -> Option<Departure> {
        let played = matches!(
            state.session.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused
        );
        if !played {
            return None;
        }
        state.session.current_track.clone().map(|track| Departure {
            track,
            played_secs: state.session.position_secs,
        })
    }

    /// Write a departure to history (best effort, off the lock)
    async fn record_departure(&self, departed: Option<Departure>) {
        let Some(Departure { track, played_secs }) = departed else {
            return;
        };
        if let Err(e) = self.inner.history.record(&track, played_secs).await {
            warn!("Failed to record history for {}: {}", track.id(), e);
        }
    }

    /// Switch the session to `track` in `Loading`
    fn begin_load(&self, state: &mut State, track: &Track) {
        self.set_status(state, PlaybackStatus::Loading);
        state.session.current_track = Some(track.clone());
        state.session.position_secs = 0.0;
        state.session.duration_secs = 0.0;
        state.session.last_error = None;
        state.last_saved_position = None;
        self.emit(state);
    }

    /// Move the queue forward after the outgoing track was left
    fn step_forward(&self, state: &mut State) -> Step {
        match state.queue.next() {
            Some(track) => {
                self.begin_load(state, &track);
                Step::Load(track)
            }
            None => {
                info!("End of queue");
                self.set_status(state, PlaybackStatus::Idle);
                state.session.current_track = None;
                state.session.position_secs = 0.0;
                state.session.duration_secs = 0.0;
                self.emit(state);
                Step::EndOfQueue
            }
        }
    }

    async fn after_step(&self, generation: u64, step: Step) -> Result<()> {
        match step {
            Step::Load(track) => self.finish_load(generation, track, None, true).await,
            Step::EndOfQueue => {
                let _guard = self.inner.transport_guard.lock().await;
                if self.is_current(generation) {
                    if let Err(e) = self.inner.transport.pause().await {
                        warn!("Transport pause at end of queue failed: {}", e);
                    }
                }
                Ok(())
            }
        }
    }

    /// Resolve the stream for `track`, then load it
    async fn finish_load(
        &self,
        generation: u64,
        track: Track,
        start_at: Option<f64>,
        autoplay: bool,
    ) -> Result<()> {
        match self.inner.resolver.resolve(&track).await {
            Ok(url) => {
                self.load_and_play(generation, &track, &url, start_at, autoplay)
                    .await
            }
            Err(e) => {
                self.fail(generation, PlaybackError::resolution(track.title(), e))
                    .await
            }
        }
    }

    async fn load_and_play(
        &self,
        generation: u64,
        track: &Track,
        url: &str,
        start_at: Option<f64>,
        autoplay: bool,
    ) -> Result<()> {
        let driven = {
            let _guard = self.inner.transport_guard.lock().await;
            self.drive_transport(generation, url, start_at, autoplay)
                .await
        };
        match driven {
            Ok(true) => {}
            Ok(false) => {
                debug!("Load of {} superseded", track.id());
                return Ok(());
            }
            Err(e) => return self.fail(generation, e).await,
        }

        let (now_playing, position) = {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                debug!("Load of {} superseded", track.id());
                return Ok(());
            }

            state.transport_loaded = true;
            state.session.position_secs = start_at.unwrap_or(0.0);
            state.session.duration_secs = self.inner.transport.duration();
            if autoplay {
                self.set_status(&mut state, PlaybackStatus::Playing);
                self.start_clock(&mut state);
            } else {
                self.set_status(&mut state, PlaybackStatus::Paused);
            }
            self.emit(&mut state);
            (self.now_playing(&mut state), state.session.position_secs)
        };

        info!("Now playing {} ({})", track.title(), track.id());
        self.push_remote(now_playing, autoplay, position).await;
        Ok(())
    }

    /// Load, seek and play under the transport guard
    ///
    /// Returns `Ok(false)` if the generation went stale before a command.
    async fn drive_transport(
        &self,
        generation: u64,
        url: &str,
        start_at: Option<f64>,
        autoplay: bool,
    ) -> Result<bool> {
        let transport = &self.inner.transport;

        if !self.is_current(generation) {
            return Ok(false);
        }
        transport
            .load(url)
            .await
            .map_err(|e| PlaybackError::transport("load", e))?;

        if let Some(position) = start_at.filter(|p| *p > 0.0) {
            transport
                .seek(position)
                .await
                .map_err(|e| PlaybackError::transport("seek", e))?;
        }

        if !self.is_current(generation) {
            return Ok(false);
        }
        if autoplay {
            transport
                .play()
                .await
                .map_err(|e| PlaybackError::transport("play", e))?;
        }
        Ok(true)
    }

    /// Surface a failure as `Error` unless a newer request took over
    async fn fail(&self, generation: u64, err: PlaybackError) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if !self.is_current(generation) {
            debug!("Ignoring failure of superseded request: {}", err);
            return Ok(());
        }

        error!("{}", err);
        self.set_status(&mut state, PlaybackStatus::Error);
        state.session.last_error = Some(err.to_string());
        self.emit(&mut state);
        Err(err)
    }

    /// Now-playing metadata if it differs from the last push
    pub(crate) fn now_playing(&self, state: &mut State) -> Option<NowPlaying> {
        let track = state.session.current_track.as_ref()?;
        let metadata = NowPlaying::for_track(track, state.session.duration_secs);
        if state.last_now_playing.as_ref() == Some(&metadata) {
            return None;
        }
        state.last_now_playing = Some(metadata.clone());
        Some(metadata)
    }

    pub(crate) async fn push_remote(
        &self,
        now_playing: Option<NowPlaying>,
        is_playing: bool,
        position_secs: f64,
    ) {
        let Some(bridge) = self.inner.remote.bridge() else {
            return;
        };
        if let Some(metadata) = now_playing {
            if let Err(e) = bridge.push_now_playing(metadata).await {
                warn!("Failed to push now-playing metadata: {}", e);
            }
        }
        if let Err(e) = bridge.push_playback_state(is_playing, position_secs).await {
            warn!("Failed to push playback state: {}", e);
        }
    }

    pub(crate) async fn persist(&self, saved: &SessionState) {
        if let Err(e) = self.inner.session_store.save(saved).await {
            warn!("Failed to persist session: {}", e);
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .field("remote", &self.inner.remote)
            .finish_non_exhaustive()
    }
}
