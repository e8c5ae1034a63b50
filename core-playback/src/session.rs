//! # Playback Session
//!
//! Owns the listening state of one client: the current episode, transport
//! state, position and duration, volume and rate, loop/shuffle flags, the
//! play queue and the shuffle history.
//!
//! The session drives a host [`MediaElement`] and consumes the events it
//! emits. Every load is tagged with a fresh generation; events carrying an
//! older generation belong to a superseded load and are dropped, so a slow
//! resource can never overwrite the state of the episode that replaced it.
//!
//! The session is a plain `&mut self` state machine. Hosts that want a
//! shareable handle run it inside [`PlayerService`](crate::service::PlayerService).

use bridge_traits::media::{Generation, MediaElement, MediaEvent, MediaEventEnvelope, MediaSource};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::keyboard::KeyCommand;
use crate::preferences::PlayerPreferences;
use crate::progress::ProgressPersister;
use crate::queue::{PlayHistory, PlayQueue};
use crate::types::{Episode, EpisodeId, PlaybackSnapshot, TransportState};

/// Random source used for shuffle picks.
pub type ShuffleRng = Box<dyn RngCore + Send + Sync>;

pub struct PlaybackSession {
    media: Arc<dyn MediaElement>,
    config: PlayerConfig,
    preferences: Option<PlayerPreferences>,
    progress: Option<ProgressPersister>,
    events: Option<EventBus>,
    rng: ShuffleRng,

    current: Option<Episode>,
    transport: TransportState,
    position_secs: f64,
    duration_secs: f64,
    volume: f64,
    playback_rate: f64,
    looping: bool,
    shuffling: bool,
    queue: PlayQueue,
    history: PlayHistory,
    generation: Generation,
    loading: bool,
    /// Whether the media element holds the current episode's resource.
    loaded: bool,
}

impl PlaybackSession {
    /// Create a stopped session with an empty queue.
    ///
    /// Fails with [`PlaybackError::InvalidConfig`] when `config` does not
    /// validate.
    pub fn new(media: Arc<dyn MediaElement>, config: PlayerConfig) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let volume = config.default_volume;
        let playback_rate = config.default_playback_rate;
        Ok(Self {
            media,
            config,
            preferences: None,
            progress: None,
            events: None,
            rng: Box::new(StdRng::from_entropy()),
            current: None,
            transport: TransportState::Stopped,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume,
            playback_rate,
            looping: false,
            shuffling: false,
            queue: PlayQueue::new(),
            history: PlayHistory::new(),
            generation: 0,
            loading: false,
            loaded: false,
        })
    }

    pub fn with_preferences(mut self, preferences: PlayerPreferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_progress(mut self, progress: ProgressPersister) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the shuffle random source (seeded RNGs in tests).
    pub fn with_rng(mut self, rng: ShuffleRng) -> Self {
        self.rng = rng;
        self
    }

    /// Apply stored volume and rate to the media element.
    ///
    /// Without a preference store the configured defaults are applied.
    pub async fn restore_preferences(&mut self) -> Result<()> {
        let (volume, rate) = match &self.preferences {
            Some(preferences) => {
                let stored = preferences.load(&self.config).await;
                (stored.volume, stored.playback_rate)
            }
            None => (self.config.default_volume, self.config.default_playback_rate),
        };

        self.media.set_volume(volume).await?;
        self.media.set_playback_rate(rate).await?;
        self.volume = volume;
        self.playback_rate = rate;
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current.as_ref()
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.shuffling
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn history(&self) -> &PlayHistory {
        &self.history
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            episode: self.current.clone(),
            transport: self.transport,
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            volume: self.volume,
            playback_rate: self.playback_rate,
            looping: self.looping,
            shuffling: self.shuffling,
            queue: self.queue.episodes().to_vec(),
            is_loading: self.loading,
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start `episode`, or toggle play/pause if it is already current.
    #[instrument(skip(self, episode), fields(episode_id = %episode.id))]
    pub async fn play_episode(&mut self, episode: Episode) -> Result<()> {
        if self.current_id() == Some(&episode.id) {
            return self.toggle_play_pause().await;
        }

        if self.transport.is_playing() {
            if let Err(e) = self.media.pause().await {
                warn!(error = %e, "Failed to pause previous episode");
            }
        }

        self.current = Some(episode.clone());
        self.transport = TransportState::Stopped;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        if let Some(progress) = &mut self.progress {
            progress.reset();
        }
        self.load(&episode).await?;
        let generation = self.generation;

        if let Err(e) = self.media.play().await {
            let error = PlaybackError::from_play(e);
            self.fail(&episode.id, &error);
            return Err(error);
        }

        self.loading = false;
        self.transport = TransportState::Playing;
        self.history.record(episode.id.clone());
        info!(generation, title = %episode.title, "Playback started");
        self.publish(PlaybackEvent::Started {
            episode_id: episode.id.to_string(),
            title: episode.title,
        });
        Ok(())
    }

    /// Pause when playing, otherwise play. No-op without a current episode.
    pub async fn toggle_play_pause(&mut self) -> Result<()> {
        let Some(episode_id) = self.current_id().cloned() else {
            return Ok(());
        };

        match self.transport {
            TransportState::Playing => {
                self.media.pause().await?;
                self.refresh_position().await;
                self.transport = TransportState::Paused;
                debug!(episode_id = %episode_id, position = self.position_secs, "Paused");

                if let Some(progress) = &self.progress {
                    progress.save(&episode_id, self.position_secs);
                }
                self.publish(PlaybackEvent::Paused {
                    episode_id: episode_id.to_string(),
                    position_ms: secs_to_ms(self.position_secs),
                });
            }
            TransportState::Paused | TransportState::Stopped => {
                if !self.loaded {
                    if let Some(episode) = self.current.clone() {
                        debug!(episode_id = %episode_id, "Reloading episode before play");
                        self.position_secs = 0.0;
                        self.duration_secs = 0.0;
                        self.load(&episode).await?;
                    }
                }
                if let Err(e) = self.media.play().await {
                    let error = PlaybackError::from_play(e);
                    self.fail(&episode_id, &error);
                    return Err(error);
                }
                // Media elements restart a finished resource from the top.
                if self.duration_secs > 0.0 && self.position_secs >= self.duration_secs {
                    self.position_secs = 0.0;
                }
                self.loading = false;
                self.transport = TransportState::Playing;
                self.publish(PlaybackEvent::Resumed {
                    episode_id: episode_id.to_string(),
                    position_ms: secs_to_ms(self.position_secs),
                });
            }
        }
        Ok(())
    }

    /// Move the playhead to `position_secs`, clamped to `[0, duration]`.
    pub async fn seek_to(&mut self, position_secs: f64) -> Result<()> {
        let Some(episode_id) = self.current_id().cloned() else {
            return Err(PlaybackError::NoEpisodeLoaded);
        };

        let target = if position_secs.is_nan() {
            0.0
        } else {
            position_secs.clamp(0.0, self.duration_secs.max(0.0))
        };

        self.media.seek(target).await?;
        self.position_secs = target;
        self.publish(PlaybackEvent::PositionChanged {
            episode_id: episode_id.to_string(),
            position_ms: secs_to_ms(target),
            duration_ms: secs_to_ms(self.duration_secs),
        });
        Ok(())
    }

    pub async fn skip_forward(&mut self, secs: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        self.refresh_position().await;
        self.seek_to(self.position_secs + secs).await
    }

    pub async fn skip_backward(&mut self, secs: f64) -> Result<()> {
        if self.current.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }
        self.refresh_position().await;
        self.seek_to(self.position_secs - secs).await
    }

    /// Set the volume, clamped to `[0, 1]`, and remember it.
    pub async fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !volume.is_finite() {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        let volume = volume.clamp(0.0, 1.0);

        self.media.set_volume(volume).await?;
        self.volume = volume;

        if let Some(preferences) = &self.preferences {
            if let Err(e) = preferences.save_volume(volume).await {
                warn!(error = %e, "Failed to persist volume");
            }
        }
        Ok(())
    }

    /// Mute, or restore the unmute volume when already silent.
    pub async fn toggle_mute(&mut self) -> Result<()> {
        let target = if self.volume > 0.0 {
            0.0
        } else {
            self.config.unmute_volume
        };
        self.set_volume(target).await
    }

    /// Set the playback rate, clamped to the configured bounds, and remember
    /// it.
    pub async fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PlaybackError::InvalidPlaybackRate(rate));
        }
        let rate = self.config.clamp_playback_rate(rate);

        self.media.set_playback_rate(rate).await?;
        self.playback_rate = rate;

        if let Some(preferences) = &self.preferences {
            if let Err(e) = preferences.save_playback_rate(rate).await {
                warn!(error = %e, "Failed to persist playback rate");
            }
        }
        Ok(())
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffling = !self.shuffling;
        self.shuffling
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Append `episode` unless already queued. Returns whether it was added.
    pub fn add_to_queue(&mut self, episode: Episode) -> bool {
        let added = self.queue.add(episode);
        if added {
            self.publish_queue_changed();
        }
        added
    }

    /// Drop `episode_id` from the queue. The current episode keeps playing.
    pub fn remove_from_queue(&mut self, episode_id: &EpisodeId) -> bool {
        let removed = self.queue.remove(episode_id);
        if removed {
            self.publish_queue_changed();
        }
        removed
    }

    /// Empty the queue and forget the shuffle history.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.history.clear();
        self.publish_queue_changed();
    }

    /// Play the next queued episode. No-op on an empty queue.
    pub async fn play_next(&mut self) -> Result<()> {
        let next = if self.shuffling {
            self.queue
                .pick_shuffled(&mut self.history, &mut *self.rng)
                .cloned()
        } else {
            self.queue.next_after(self.current_id()).cloned()
        };

        match next {
            Some(episode) => self.play_episode(episode).await,
            None => Ok(()),
        }
    }

    /// Restart the current episode when past the restart threshold,
    /// otherwise play the previous queued episode. No-op on an empty queue.
    pub async fn play_previous(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        if self.current.is_some() {
            self.refresh_position().await;
            if self.position_secs > self.config.restart_threshold_secs {
                return self.seek_to(0.0).await;
            }
        }

        match self.queue.previous_before(self.current_id()).cloned() {
            Some(episode) => self.play_episode(episode).await,
            None => Ok(()),
        }
    }

    // ========================================================================
    // Media Events and Ticks
    // ========================================================================

    /// Apply an event from the media element.
    pub async fn handle_media_event(&mut self, envelope: MediaEventEnvelope) -> Result<()> {
        if envelope.generation != self.generation {
            trace!(
                stale = envelope.generation,
                current = self.generation,
                "Discarding media event from superseded load"
            );
            return Ok(());
        }

        match envelope.event {
            MediaEvent::MetadataReady { duration_secs } => {
                self.duration_secs = if duration_secs.is_finite() && duration_secs > 0.0 {
                    duration_secs
                } else {
                    self.current
                        .as_ref()
                        .and_then(|e| e.duration_secs)
                        .filter(|d| d.is_finite() && *d > 0.0)
                        .unwrap_or(0.0)
                };
                debug!(duration = self.duration_secs, "Metadata ready");
            }
            MediaEvent::TimeUpdate { position_secs } => {
                if position_secs.is_finite() {
                    self.position_secs = self.clamp_position(position_secs);
                }
            }
            MediaEvent::Ended => return self.on_ended().await,
            MediaEvent::Error { message } => {
                let episode_id = self.current_id().cloned();
                warn!(error = %message, "Media element error");
                self.transport = TransportState::Stopped;
                self.loading = false;
                self.publish(PlaybackEvent::Error {
                    episode_id: episode_id.map(|id| id.to_string()),
                    message,
                    recoverable: true,
                });
            }
        }
        Ok(())
    }

    /// Sample the session for a progress checkpoint. Only saves while
    /// playing; see [`ProgressPersister::checkpoint`].
    pub async fn checkpoint(&mut self) -> Option<JoinHandle<()>> {
        if !self.transport.is_playing() {
            return None;
        }
        let episode_id = self.current_id().cloned()?;
        self.refresh_position().await;
        let position = self.position_secs;
        self.progress.as_mut()?.checkpoint(&episode_id, position)
    }

    /// Run the command bound to a key. Commands that need an episode are
    /// ignored when none is loaded.
    pub async fn handle_key(&mut self, command: KeyCommand) -> Result<()> {
        let result = match command {
            KeyCommand::TogglePlayPause => self.toggle_play_pause().await,
            KeyCommand::SkipForward { secs } => self.skip_forward(secs).await,
            KeyCommand::SkipBackward { secs } => self.skip_backward(secs).await,
            KeyCommand::VolumeUp { step } => self.set_volume((self.volume + step).min(1.0)).await,
            KeyCommand::VolumeDown { step } => {
                self.set_volume((self.volume - step).max(0.0)).await
            }
            KeyCommand::ToggleMute => self.toggle_mute().await,
            KeyCommand::ToggleLoop => {
                self.toggle_loop();
                Ok(())
            }
            KeyCommand::PlayNext => self.play_next().await,
            KeyCommand::PlayPrevious => self.play_previous().await,
        };

        match result {
            Err(PlaybackError::NoEpisodeLoaded) => Ok(()),
            other => other,
        }
    }

    async fn on_ended(&mut self) -> Result<()> {
        let Some(episode_id) = self.current_id().cloned() else {
            return Ok(());
        };

        let final_position = if self.duration_secs > 0.0 {
            self.duration_secs
        } else {
            self.position_secs
        };
        self.position_secs = final_position;
        self.transport = TransportState::Stopped;

        if let Some(progress) = &self.progress {
            progress.complete(&episode_id, final_position);
        }
        info!(episode_id = %episode_id, "Episode completed");
        self.publish(PlaybackEvent::Completed {
            episode_id: episode_id.to_string(),
        });

        if self.looping {
            self.media.seek(0.0).await?;
            self.position_secs = 0.0;
            if let Err(e) = self.media.play().await {
                let error = PlaybackError::from_play(e);
                self.fail(&episode_id, &error);
                return Err(error);
            }
            self.transport = TransportState::Playing;
            Ok(())
        } else if !self.queue.is_empty() {
            self.play_next().await
        } else {
            self.publish(PlaybackEvent::Stopped {
                episode_id: episode_id.to_string(),
            });
            Ok(())
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Load `episode` on the media element under a fresh generation.
    async fn load(&mut self, episode: &Episode) -> Result<()> {
        self.generation += 1;
        self.loading = true;
        self.loaded = false;

        let source = MediaSource::new(episode.audio_url.clone())
            .with_duration_hint(episode.duration_secs);
        if let Err(e) = self.media.load(source, self.generation).await {
            let error = PlaybackError::from_load(e);
            self.fail(&episode.id, &error);
            return Err(error);
        }
        self.loaded = true;
        Ok(())
    }

    fn current_id(&self) -> Option<&EpisodeId> {
        self.current.as_ref().map(|e| &e.id)
    }

    fn clamp_position(&self, position: f64) -> f64 {
        if self.duration_secs > 0.0 {
            position.clamp(0.0, self.duration_secs)
        } else {
            position.max(0.0)
        }
    }

    /// Pull the playhead from the media element; keep the cached value when
    /// the element cannot report one.
    async fn refresh_position(&mut self) {
        match self.media.position().await {
            Ok(position) if position.is_finite() => {
                self.position_secs = self.clamp_position(position);
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Media position unavailable"),
        }
    }

    fn fail(&mut self, episode_id: &EpisodeId, error: &PlaybackError) {
        warn!(episode_id = %episode_id, error = %error, "Playback failed");
        self.loading = false;
        self.transport = TransportState::Stopped;
        self.publish(PlaybackEvent::Error {
            episode_id: Some(episode_id.to_string()),
            message: error.to_string(),
            recoverable: error.is_transient(),
        });
    }

    fn publish(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.events {
            bus.publish(CoreEvent::Playback(event));
        }
    }

    fn publish_queue_changed(&self) {
        self.publish(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}
