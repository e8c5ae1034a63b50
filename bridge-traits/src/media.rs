//! Media element bridge.
//!
//! A [`MediaElement`] wraps one underlying playable resource per player
//! session (an `HTMLAudioElement` in the browser, a decoder + output stream on
//! desktop). It is reset on every episode change rather than recreated, so the
//! volume and playback rate it carries survive across episodes.
//!
//! Progress flows back to the core as [`MediaEventEnvelope`]s over an mpsc
//! channel handed to the implementation when it is constructed. Each envelope
//! carries the [`Generation`] that was passed to the `load` call which produced
//! it; the playback session discards envelopes from superseded loads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Monotonic tag identifying one `load` call.
pub type Generation = u64;

/// Sending half used by media element implementations to report events.
pub type MediaEventSender = mpsc::UnboundedSender<MediaEventEnvelope>;

/// Receiving half consumed by the player service.
pub type MediaEventReceiver = mpsc::UnboundedReceiver<MediaEventEnvelope>;

/// Create the channel connecting a media element to its player.
pub fn media_event_channel() -> (MediaEventSender, MediaEventReceiver) {
    mpsc::unbounded_channel()
}

/// Resource to be loaded into the media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// Locator of the audio bytes (usually the gated `/api/audio/{key}` route).
    pub url: String,
    /// Duration declared by the catalog, if any. Implementations that cannot
    /// probe the stream may report this as the metadata duration.
    pub duration_hint: Option<f64>,
}

impl MediaSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            duration_hint: None,
        }
    }

    pub fn with_duration_hint(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_hint = duration_secs;
        self
    }
}

/// Event reported by a media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MediaEvent {
    /// Stream metadata has loaded and the duration is known.
    MetadataReady { duration_secs: f64 },
    /// Playback position changed.
    TimeUpdate { position_secs: f64 },
    /// The resource played through to its end.
    Ended,
    /// The resource failed after loading (network drop, decode failure).
    Error { message: String },
}

/// A [`MediaEvent`] tagged with the generation of the load that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEventEnvelope {
    pub generation: Generation,
    pub event: MediaEvent,
}

impl MediaEventEnvelope {
    pub fn new(generation: Generation, event: MediaEvent) -> Self {
        Self { generation, event }
    }
}

/// Transport and property control for a single playable resource.
///
/// `play` may suspend while the resource buffers. A failure to start
/// (unreachable resource, decode error, autoplay policy) must be reported as
/// an error, never swallowed.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Replace the current resource. Any playback in progress stops and the
    /// position resets to zero. Events caused by this resource must carry
    /// `generation`.
    async fn load(&self, source: MediaSource, generation: Generation) -> Result<()>;

    /// Start or resume playback of the loaded resource.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    async fn pause(&self) -> Result<()>;

    /// Move the playhead to an absolute position in seconds.
    async fn seek(&self, position_secs: f64) -> Result<()>;

    /// Current playhead position in seconds.
    async fn position(&self) -> Result<f64>;

    /// Current volume in `0.0..=1.0`.
    fn volume(&self) -> f64;

    /// Apply a volume in `0.0..=1.0` without interrupting playback.
    async fn set_volume(&self, volume: f64) -> Result<()>;

    /// Current playback rate multiplier.
    fn playback_rate(&self) -> f64;

    /// Apply a playback rate without interrupting playback.
    async fn set_playback_rate(&self, rate: f64) -> Result<()>;
}
