//! Progress clock
//!
//! A fixed-interval task that samples the transport while playing. Each clock
//! carries the epoch it was started with; starting or stopping a clock bumps
//! the epoch, so a tick from a replaced clock never acts.

use crate::controller::PlaybackController;
use crate::types::PlaybackStatus;
use cadence_core::SessionState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Keep ticking
    Continue,

    /// This clock is no longer the active one
    Stop,

    /// Position reached the end of the track at this generation; the clock
    /// has detached itself
    TrackEnded(u64),
}

/// Spawn a clock for `epoch`
pub(crate) fn spawn(controller: &PlaybackController, epoch: u64, period: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(&controller.inner);

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(inner) = weak.upgrade() else {
                break;
            };
            let controller = PlaybackController { inner };

            match controller.on_tick(epoch).await {
                TickOutcome::Continue => {}
                TickOutcome::Stop => break,
                TickOutcome::TrackEnded(generation) => {
                    debug!("Track ended, advancing");
                    if let Err(e) = controller.advance_after_track_end(generation).await {
                        warn!("Auto-advance failed: {}", e);
                    }
                    break;
                }
            }
        }
    })
}

impl PlaybackController {
    pub(crate) async fn on_tick(&self, epoch: u64) -> TickOutcome {
        let transport = &self.inner.transport;
        let settings = &self.inner.config.clock;
        let position = transport.current_time();
        let duration = transport.duration();

        let (saved, now_playing) = {
            let mut state = self.inner.state.lock().await;
            if self.inner.clock_epoch.load(Ordering::SeqCst) != epoch
                || state.session.status != PlaybackStatus::Playing
            {
                return TickOutcome::Stop;
            }

            let session = &mut state.session;
            if (position - session.position_secs).abs() > settings.change_epsilon_secs
                || (duration - session.duration_secs).abs() > settings.change_epsilon_secs
            {
                session.position_secs = position;
                session.duration_secs = duration;
                self.emit(&mut state);
            }

            if duration > 0.0 && position >= duration - settings.end_of_track_epsilon_secs {
                // Detach without aborting: this task goes on to run the advance
                state.clock = None;
                self.inner.clock_epoch.fetch_add(1, Ordering::SeqCst);
                return TickOutcome::TrackEnded(self.inner.generation.load(Ordering::SeqCst));
            }

            let saved = match &state.session.current_track {
                Some(track) if state.last_saved_position != Some(position) => {
                    Some(SessionState {
                        track: track.clone(),
                        position_secs: position,
                    })
                }
                _ => None,
            };
            if saved.is_some() {
                state.last_saved_position = Some(position);
            }
            (saved, self.now_playing(&mut state))
        };

        if let Some(saved) = saved {
            self.persist(&saved).await;
        }
        self.push_remote(now_playing, true, position).await;
        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::controller::Collaborators;
    use async_trait::async_trait;
    use cadence_core::{
        HistoryRecorder, RecommendationSource, RemoteControl, SessionStateStore, StreamResolver,
        Track, TransportAdapter,
    };
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Transport {
        position: Mutex<f64>,
        loads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TransportAdapter for Transport {
        async fn load(&self, url: &str) -> cadence_core::Result<()> {
            self.loads.lock().unwrap().push(url.to_string());
            *self.position.lock().unwrap() = 0.0;
            Ok(())
        }
        async fn play(&self) -> cadence_core::Result<()> {
            Ok(())
        }
        async fn pause(&self) -> cadence_core::Result<()> {
            Ok(())
        }
        async fn seek(&self, position_secs: f64) -> cadence_core::Result<()> {
            *self.position.lock().unwrap() = position_secs;
            Ok(())
        }
        async fn release(&self) -> cadence_core::Result<()> {
            Ok(())
        }
        fn current_time(&self) -> f64 {
            *self.position.lock().unwrap()
        }
        fn duration(&self) -> f64 {
            180.0
        }
        fn is_playing(&self) -> bool {
            false
        }
    }

    struct Services;

    #[async_trait]
    impl StreamResolver for Services {
        async fn resolve(&self, track: &Track) -> cadence_core::Result<String> {
            Ok(format!("stream://{}", track.id()))
        }
    }

    #[async_trait]
    impl RecommendationSource for Services {
        async fn fetch(&self, _seed_track_id: &str) -> cadence_core::Result<Vec<Track>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl HistoryRecorder for Services {
        async fn record(&self, _track: &Track, _played_secs: f64) -> cadence_core::Result<()> {
            Ok(())
        }
        async fn recently_played_ids(
            &self,
            _window: Duration,
        ) -> cadence_core::Result<HashSet<String>> {
            Ok(HashSet::new())
        }
    }

    #[async_trait]
    impl SessionStateStore for Services {
        async fn save(&self, _state: &SessionState) -> cadence_core::Result<()> {
            Ok(())
        }
        async fn load(&self) -> cadence_core::Result<Option<SessionState>> {
            Ok(None)
        }
    }

    fn track(id: &str) -> Track {
        Track::new(id, format!("Track {}", id)).unwrap()
    }

    /// Controller playing "a" from [a, b, c] with its clock parked
    async fn playing_abc() -> (PlaybackController, Arc<Transport>) {
        let transport = Arc::new(Transport::default());
        let services = Arc::new(Services);

        let mut config = PlaybackConfig::default();
        config.clock.tick_interval_ms = 3_600_000;

        let controller = PlaybackController::new(
            config,
            Collaborators {
                recommendations: services.clone(),
                history: Some(services.clone()),
                resolver: services.clone(),
                transport: transport.clone(),
                session_store: services,
                remote: RemoteControl::Unavailable,
            },
        )
        .unwrap();

        controller
            .play_track(
                track("a"),
                Some(vec![track("a"), track("b"), track("c")]),
                None,
            )
            .await
            .unwrap();
        (controller, transport)
    }

    /// Run one tick at the end of the track, returning the generation seen
    async fn end_track(controller: &PlaybackController, transport: &Transport) -> u64 {
        *transport.position.lock().unwrap() = 180.0;
        let epoch = controller.inner.clock_epoch.load(Ordering::SeqCst);
        match controller.on_tick(epoch).await {
            TickOutcome::TrackEnded(generation) => generation,
            other => panic!("expected end of track, got {:?}", other),
        }
    }

    async fn current_id(controller: &PlaybackController) -> Option<String> {
        controller
            .snapshot()
            .await
            .current_track_id()
            .map(str::to_string)
    }

    #[tokio::test]
    async fn track_end_advances_once() {
        let (controller, transport) = playing_abc().await;

        let generation = end_track(&controller, &transport).await;
        assert!(!controller.clock_running().await);

        controller.advance_after_track_end(generation).await.unwrap();
        assert_eq!(current_id(&controller).await.as_deref(), Some("b"));
        assert!(controller.clock_running().await);
    }

    #[tokio::test]
    async fn skip_after_track_end_is_not_doubled() {
        let (controller, transport) = playing_abc().await;

        let generation = end_track(&controller, &transport).await;
        controller.play_next().await.unwrap();
        controller.advance_after_track_end(generation).await.unwrap();

        assert_eq!(current_id(&controller).await.as_deref(), Some("b"));
        assert_eq!(
            *transport.loads.lock().unwrap(),
            vec!["stream://a", "stream://b"]
        );
    }

    #[tokio::test]
    async fn pause_after_track_end_holds() {
        let (controller, transport) = playing_abc().await;

        let generation = end_track(&controller, &transport).await;
        controller.pause().await.unwrap();
        controller.advance_after_track_end(generation).await.unwrap();

        let session = controller.snapshot().await;
        assert_eq!(session.status, PlaybackStatus::Paused);
        assert_eq!(session.current_track_id(), Some("a"));
    }

    #[tokio::test]
    async fn tick_from_replaced_clock_stops() {
        let (controller, _transport) = playing_abc().await;
        let stale = controller.inner.clock_epoch.load(Ordering::SeqCst) - 1;
        assert_eq!(controller.on_tick(stale).await, TickOutcome::Stop);
    }
}
