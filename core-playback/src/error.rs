//! # Playback Error Types
//!
//! Errors surfaced to callers of the playback session and player service.
//! Progress persistence never produces one of these: its failures are logged
//! and dropped.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The media element could not load the episode's audio resource.
    #[error("Failed to load audio source: {0}")]
    LoadFailed(String),

    /// The media element refused to start playback.
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Attempted operation when no episode is loaded.
    #[error("No episode loaded")]
    NoEpisodeLoaded,

    /// Volume was not a finite number.
    #[error("Invalid volume: {0} (must be a finite number)")]
    InvalidVolume(f64),

    /// Playback rate was not finite or not positive.
    #[error("Invalid playback rate: {0} (must be finite and > 0)")]
    InvalidPlaybackRate(f64),

    /// The media element failed a transport command (seek, volume, rate).
    #[error("Media element error: {0}")]
    Media(#[from] BridgeError),

    // ========================================================================
    // Service Errors
    // ========================================================================
    /// Player configuration is invalid.
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    /// The player service task is no longer running.
    #[error("Player service stopped")]
    ServiceStopped,
}

impl PlaybackError {
    /// Classify a media element failure raised while starting an episode.
    pub(crate) fn from_load(error: BridgeError) -> Self {
        match error {
            BridgeError::PlaybackRejected(msg) => PlaybackError::PlaybackRejected(msg),
            other => PlaybackError::LoadFailed(other.to_string()),
        }
    }

    /// Classify a media element failure raised by `play()`.
    pub(crate) fn from_play(error: BridgeError) -> Self {
        match error {
            BridgeError::PlaybackRejected(msg) => PlaybackError::PlaybackRejected(msg),
            other => PlaybackError::PlaybackRejected(other.to_string()),
        }
    }

    /// Returns `true` if this error is transient and the command can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::PlaybackRejected(_)
                | PlaybackError::Media(BridgeError::NotAvailable(_))
        )
    }

    /// Returns `true` if the caller passed a value outside the accepted domain.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidVolume(_) | PlaybackError::InvalidPlaybackRate(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
