//! # Host Bridge Traits
//!
//! Capability contracts the podcast core expects the host application to
//! provide.
//!
//! ## Overview
//!
//! The playback session, access gate and progress persister never talk to a
//! browser, an audio device, an object store or the network directly. Every
//! such capability is expressed as a trait in this crate and injected at
//! construction time, which keeps the core deterministic under test and lets
//! each host ship its own adapters.
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaElement`](media::MediaElement) - A single playable audio resource
//!   (load, play/pause, seek, volume, rate) that reports its progress as
//!   [`MediaEventEnvelope`](media::MediaEventEnvelope)s
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Durable per-client key-value
//!   preferences (volume, playback rate)
//! - [`AudioStore`](storage::AudioStore) - Object storage holding uploaded
//!   episode audio
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the progress reporter
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Implementations
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop / server | `bridge-desktop` |
//! | Browser  | host-provided (HTMLAudioElement, localStorage) |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod media;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use media::{
    media_event_channel, Generation, MediaElement, MediaEvent, MediaEventEnvelope,
    MediaEventReceiver, MediaEventSender, MediaSource,
};
pub use storage::{AudioObject, AudioStore, SettingsStore};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
