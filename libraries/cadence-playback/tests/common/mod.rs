//! Shared fakes for controller integration tests

use async_trait::async_trait;
use cadence_core::{
    CommandHandler, CoreError, HistoryRecorder, NowPlaying, RecommendationSource, RemoteCommand,
    RemoteControl, RemoteControlBridge, SessionState, SessionStateStore, StreamResolver, Track,
    TransportAdapter,
};
use cadence_playback::{
    Collaborators, PlaybackConfig, PlaybackController, PlaybackSession, SessionSubscription,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Notify;

static INIT: Once = Once::new();

pub fn init_tracing() {
    // Initialize logging once
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Track {}", id))
        .unwrap()
        .with_artists(["Test Artist"])
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn numbered(prefix: &str, n: usize) -> Vec<Track> {
    (0..n).map(|i| track(&format!("{}{}", prefix, i))).collect()
}

pub fn url_for(id: &str) -> String {
    format!("https://stream.test/{}", id)
}

// ---- transport ----

#[derive(Debug, Default)]
pub struct TransportState {
    pub loads: Vec<String>,
    pub commands: Vec<String>,
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
    pub releases: usize,
    pub fail_load: bool,
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    state: Mutex<TransportState>,
}

impl FakeTransport {
    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.state.lock().unwrap().fail_load = fail;
    }

    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }
}

#[async_trait]
impl TransportAdapter for FakeTransport {
    async fn load(&self, url: &str) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(format!("load {}", url));
        if state.fail_load {
            return Err(CoreError::transport("unsupported codec"));
        }
        state.loads.push(url.to_string());
        state.position = 0.0;
        state.duration = 180.0;
        state.playing = false;
        Ok(())
    }

    async fn play(&self) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push("play".to_string());
        state.playing = true;
        Ok(())
    }

    async fn pause(&self) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push("pause".to_string());
        state.playing = false;
        Ok(())
    }

    async fn seek(&self, position_secs: f64) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(format!("seek {}", position_secs));
        state.position = position_secs;
        Ok(())
    }

    async fn release(&self) -> cadence_core::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push("release".to_string());
        state.releases += 1;
        state.playing = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

// ---- resolver ----

#[derive(Debug, Default)]
pub struct FakeResolver {
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeResolver {
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    /// Hold resolution of `id` until the returned notify is triggered
    pub fn gate(&self, id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(id.to_string(), Arc::clone(&notify));
        notify
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, track: &Track) -> cadence_core::Result<String> {
        let gate = self.gates.lock().unwrap().get(track.id()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().unwrap().contains(track.id()) {
            return Err(CoreError::resolution("no playable stream"));
        }
        Ok(url_for(track.id()))
    }
}

// ---- recommendations ----

#[derive(Debug, Default)]
pub struct FakeRecommendations {
    by_seed: Mutex<HashMap<String, Vec<Track>>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl FakeRecommendations {
    pub fn set(&self, seed: &str, tracks: Vec<Track>) {
        self.by_seed.lock().unwrap().insert(seed.to_string(), tracks);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecommendationSource for FakeRecommendations {
    async fn fetch(&self, seed_track_id: &str) -> cadence_core::Result<Vec<Track>> {
        self.calls.lock().unwrap().push(seed_track_id.to_string());
        if *self.failing.lock().unwrap() {
            return Err(CoreError::service("recommendations unavailable"));
        }
        Ok(self
            .by_seed
            .lock()
            .unwrap()
            .get(seed_track_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ---- history ----

#[derive(Debug, Default)]
pub struct FakeHistory {
    recent: Mutex<HashSet<String>>,
    recorded: Mutex<Vec<(String, f64)>>,
}

impl FakeHistory {
    pub fn set_recent(&self, ids: &[&str]) {
        *self.recent.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn recorded(&self) -> Vec<(String, f64)> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryRecorder for FakeHistory {
    async fn record(&self, track: &Track, played_secs: f64) -> cadence_core::Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .push((track.id().to_string(), played_secs));
        Ok(())
    }

    async fn recently_played_ids(&self, _window: Duration) -> cadence_core::Result<HashSet<String>> {
        Ok(self.recent.lock().unwrap().clone())
    }
}

// ---- session store ----

#[derive(Debug, Default)]
pub struct FakeStore {
    saved: Mutex<Option<SessionState>>,
    saves: Mutex<usize>,
}

impl FakeStore {
    pub fn preset(&self, state: SessionState) {
        *self.saved.lock().unwrap() = Some(state);
    }

    pub fn saved(&self) -> Option<SessionState> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SessionStateStore for FakeStore {
    async fn save(&self, state: &SessionState) -> cadence_core::Result<()> {
        *self.saved.lock().unwrap() = Some(state.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load(&self) -> cadence_core::Result<Option<SessionState>> {
        Ok(self.saved.lock().unwrap().clone())
    }
}

// ---- remote bridge ----

#[derive(Default)]
pub struct FakeBridge {
    handler: Mutex<Option<CommandHandler>>,
    now_playing: Mutex<Vec<NowPlaying>>,
    states: Mutex<Vec<(bool, f64)>>,
}

impl FakeBridge {
    /// Deliver a command as the OS would
    pub fn press(&self, command: RemoteCommand) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(command);
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    pub fn now_playing(&self) -> Vec<NowPlaying> {
        self.now_playing.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<(bool, f64)> {
        self.states.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteControlBridge for FakeBridge {
    async fn push_now_playing(&self, metadata: NowPlaying) -> cadence_core::Result<()> {
        self.now_playing.lock().unwrap().push(metadata);
        Ok(())
    }

    async fn push_playback_state(&self, is_playing: bool, position_secs: f64) -> cadence_core::Result<()> {
        self.states.lock().unwrap().push((is_playing, position_secs));
        Ok(())
    }

    fn set_command_handler(&self, handler: CommandHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }
}

// ---- harness ----

pub struct Harness {
    pub controller: PlaybackController,
    pub transport: Arc<FakeTransport>,
    pub resolver: Arc<FakeResolver>,
    pub recommendations: Arc<FakeRecommendations>,
    pub history: Arc<FakeHistory>,
    pub store: Arc<FakeStore>,
    pub bridge: Arc<FakeBridge>,
}

impl Harness {
    /// Harness whose progress clock never ticks within a test
    pub fn new() -> Self {
        let mut config = PlaybackConfig::default();
        config.clock.tick_interval_ms = 3_600_000;
        Self::with_config(config)
    }

    pub fn with_config(config: PlaybackConfig) -> Self {
        init_tracing();

        let transport = Arc::new(FakeTransport::default());
        let resolver = Arc::new(FakeResolver::default());
        let recommendations = Arc::new(FakeRecommendations::default());
        let history = Arc::new(FakeHistory::default());
        let store = Arc::new(FakeStore::default());
        let bridge = Arc::new(FakeBridge::default());

        let controller = PlaybackController::new(
            config,
            Collaborators {
                recommendations: recommendations.clone(),
                history: Some(history.clone()),
                resolver: resolver.clone(),
                transport: transport.clone(),
                session_store: store.clone(),
                remote: RemoteControl::Available(bridge.clone()),
            },
        )
        .expect("valid controller");

        Self {
            controller,
            transport,
            resolver,
            recommendations,
            history,
            store,
            bridge,
        }
    }

    pub async fn current_id(&self) -> Option<String> {
        self.controller
            .snapshot()
            .await
            .current_track_id()
            .map(str::to_string)
    }
}

/// Receive snapshots until one matches, failing after a (virtual) timeout
pub async fn wait_for<F>(subscription: &mut SessionSubscription, mut predicate: F) -> PlaybackSession
where
    F: FnMut(&PlaybackSession) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let session = subscription.recv().await.expect("controller alive");
            if predicate(&session) {
                return session;
            }
        }
    })
    .await
    .expect("expected session state was never broadcast")
}
