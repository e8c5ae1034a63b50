//! Headless media element driven by the Tokio clock

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{
        Generation, MediaElement, MediaEvent, MediaEventEnvelope, MediaEventSender, MediaSource,
    },
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, trace};

const DEFAULT_TICK: Duration = Duration::from_millis(250);

/// Media element that plays nothing audible.
///
/// The playhead advances with `tokio::time` at the configured playback rate,
/// and `TimeUpdate`/`Ended` events are emitted the way a browser audio element
/// would emit them. Useful for CLI hosts, server-side simulation and tests
/// (with `tokio::time::pause`). The duration is taken from the source's
/// `duration_hint`; without one it is reported as NaN, like a live stream.
pub struct HeadlessMediaElement {
    shared: Arc<Shared>,
}

struct Shared {
    events: MediaEventSender,
    tick: Duration,
    state: Mutex<Transport>,
}

struct Transport {
    source: Option<MediaSource>,
    generation: Generation,
    duration: Option<f64>,
    base_position: f64,
    started_at: Option<Instant>,
    volume: f64,
    rate: f64,
    ticker: Option<JoinHandle<()>>,
}

impl Transport {
    fn position(&self) -> f64 {
        let elapsed = self
            .started_at
            .map(|start| start.elapsed().as_secs_f64() * self.rate)
            .unwrap_or(0.0);
        let position = self.base_position + elapsed;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Fold elapsed time into `base_position` so rate and seek changes apply
    /// from now on.
    fn rebase(&mut self) {
        self.base_position = self.position();
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl HeadlessMediaElement {
    pub fn new(events: MediaEventSender) -> Self {
        Self::with_tick_interval(events, DEFAULT_TICK)
    }

    /// Element reporting `TimeUpdate` every `tick`.
    pub fn with_tick_interval(events: MediaEventSender, tick: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                events,
                tick,
                state: Mutex::new(Transport {
                    source: None,
                    generation: 0,
                    duration: None,
                    base_position: 0.0,
                    started_at: None,
                    volume: 1.0,
                    rate: 1.0,
                    ticker: None,
                }),
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().started_at.is_some()
    }

    pub fn current_source(&self) -> Option<MediaSource> {
        self.shared.lock().source.clone()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Transport> {
        // A poisoned lock only means a ticker panicked mid-update; the
        // transport fields are still individually valid.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, generation: Generation, event: MediaEvent) {
        if self
            .events
            .send(MediaEventEnvelope::new(generation, event))
            .is_err()
        {
            trace!("Media event receiver dropped");
        }
    }

    fn spawn_ticker(self: &Arc<Self>, generation: Generation) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(shared.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let mut state = shared.lock();
                if state.generation != generation || state.started_at.is_none() {
                    break;
                }

                let position = state.position();
                let finished = state.duration.is_some_and(|d| position >= d);
                shared.emit(generation, MediaEvent::TimeUpdate { position_secs: position });

                if finished {
                    state.base_position = position;
                    state.started_at = None;
                    state.ticker = None;
                    shared.emit(generation, MediaEvent::Ended);
                    debug!(generation, "Headless playback reached the end");
                    break;
                }
            }
        })
    }
}

impl Drop for HeadlessMediaElement {
    fn drop(&mut self) {
        self.shared.lock().stop_ticker();
    }
}

#[async_trait]
impl MediaElement for HeadlessMediaElement {
    async fn load(&self, source: MediaSource, generation: Generation) -> Result<()> {
        let duration = source.duration_hint.filter(|d| d.is_finite() && *d >= 0.0);
        {
            // Whatever was playing stops even when the new source is rejected.
            let mut state = self.shared.lock();
            state.stop_ticker();
            state.source = None;
            state.generation = generation;
            state.duration = None;
            state.base_position = 0.0;
            state.started_at = None;

            if source.url.trim().is_empty() {
                return Err(BridgeError::PlaybackRejected(
                    "Media source URL is empty".to_string(),
                ));
            }
            state.source = Some(source);
            state.duration = duration;
        }

        debug!(generation, ?duration, "Headless media loaded");
        self.shared.emit(
            generation,
            MediaEvent::MetadataReady {
                duration_secs: duration.unwrap_or(f64::NAN),
            },
        );
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let mut state = self.shared.lock();
        if state.source.is_none() {
            return Err(BridgeError::PlaybackRejected(
                "No media source loaded".to_string(),
            ));
        }
        if state.started_at.is_some() {
            return Ok(());
        }

        if state.duration.is_some_and(|d| state.base_position >= d) {
            state.base_position = 0.0;
        }
        state.started_at = Some(Instant::now());
        let generation = state.generation;
        state.ticker = Some(self.shared.spawn_ticker(generation));
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut state = self.shared.lock();
        state.base_position = state.position();
        state.started_at = None;
        state.stop_ticker();
        Ok(())
    }

    async fn seek(&self, position_secs: f64) -> Result<()> {
        if !position_secs.is_finite() {
            return Err(BridgeError::OperationFailed(format!(
                "Cannot seek to {}",
                position_secs
            )));
        }

        let (generation, position) = {
            let mut state = self.shared.lock();
            let mut position = position_secs.max(0.0);
            if let Some(duration) = state.duration {
                position = position.min(duration);
            }
            state.base_position = position;
            if state.started_at.is_some() {
                state.started_at = Some(Instant::now());
            }
            (state.generation, position)
        };

        self.shared
            .emit(generation, MediaEvent::TimeUpdate { position_secs: position });
        Ok(())
    }

    async fn position(&self) -> Result<f64> {
        Ok(self.shared.lock().position())
    }

    fn volume(&self) -> f64 {
        self.shared.lock().volume
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        self.shared.lock().volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    fn playback_rate(&self) -> f64 {
        self.shared.lock().rate
    }

    async fn set_playback_rate(&self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid playback rate: {}",
                rate
            )));
        }
        let mut state = self.shared.lock();
        state.rebase();
        state.rate = rate;
        Ok(())
    }
}
