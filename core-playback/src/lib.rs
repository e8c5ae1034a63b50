//! # Playback Module
//!
//! The client-side listening model of the podcast core.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback session state machine (Stopped / Playing / Paused) over a
//!   host media element
//! - The play queue with wraparound navigation and no-repeat shuffle
//! - Volume and playback-rate preferences that survive restarts
//! - Best-effort progress checkpoints, pause saves and completion saves
//! - Keyboard shortcuts
//! - A single-owner player task ([`PlayerService`]) with a cloneable handle
//!
//! ## Usage
//!
//! ```no_run
//! use bridge_traits::media::{media_event_channel, MediaElement};
//! use core_playback::{Episode, PlaybackSession, PlayerConfig, PlayerService};
//! use std::sync::Arc;
//!
//! # async fn run(media: Arc<dyn MediaElement>) -> core_playback::Result<()> {
//! # let (_tx, media_events) = media_event_channel();
//! let session = PlaybackSession::new(media, PlayerConfig::default())?;
//! let player = PlayerService::spawn(session, media_events);
//!
//! player
//!     .play_episode(Episode::new("ep-1", "Pilot", "/api/audio/ep-1.mp3"))
//!     .await?;
//! println!("{:?}", player.snapshot().transport);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod keyboard;
pub mod preferences;
pub mod progress;
pub mod queue;
pub mod service;
pub mod session;
pub mod types;

pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use keyboard::{FocusTarget, Key, KeyCommand, KeyPress};
pub use preferences::{PlayerPreferences, StoredPreferences, PLAYBACK_RATE_KEY, VOLUME_KEY};
pub use progress::{HttpProgressSink, ProgressPersister, ProgressSink, ProgressUpdate};
pub use queue::{PlayHistory, PlayQueue};
pub use service::{PlayerCommand, PlayerHandle, PlayerService};
pub use session::PlaybackSession;
pub use types::{Episode, EpisodeId, PlaybackSnapshot, TransportState};
