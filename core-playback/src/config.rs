//! # Player Configuration
//!
//! Tuning knobs for the playback session, keyboard surface and progress
//! checkpointing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player configuration.
///
/// Every field has a serde default, so a host can deserialize a partial
/// document (or `{}`) and get the stock player behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Seconds moved by a plain skip (arrow keys, skip buttons).
    ///
    /// Default: 15 seconds.
    #[serde(default = "default_skip_secs")]
    pub skip_secs: f64,

    /// Seconds moved by a Shift+arrow skip.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_long_skip_secs")]
    pub long_skip_secs: f64,

    /// "Previous" restarts the current episode instead of navigating when the
    /// position is past this many seconds.
    ///
    /// Default: 3 seconds.
    #[serde(default = "default_restart_threshold_secs")]
    pub restart_threshold_secs: f64,

    /// Width of a progress checkpoint bucket. At most one checkpoint save is
    /// issued per bucket.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_checkpoint_bucket_secs")]
    pub checkpoint_bucket_secs: f64,

    /// How often the player service samples the session for checkpoints.
    ///
    /// Default: 1 second.
    #[serde(default = "default_checkpoint_tick")]
    pub checkpoint_tick: Duration,

    /// Volume used when no preference has been stored.
    ///
    /// Default: 0.8.
    #[serde(default = "default_volume")]
    pub default_volume: f64,

    /// Playback rate used when no preference has been stored.
    ///
    /// Default: 1.0.
    #[serde(default = "default_playback_rate")]
    pub default_playback_rate: f64,

    /// Volume restored by the mute toggle.
    ///
    /// Default: 0.8.
    #[serde(default = "default_unmute_volume")]
    pub unmute_volume: f64,

    /// Volume change per Up/Down key press.
    ///
    /// Default: 0.1.
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,

    /// Slowest accepted playback rate. Slower requests are clamped.
    ///
    /// Default: 0.5.
    #[serde(default = "default_min_playback_rate")]
    pub min_playback_rate: f64,

    /// Fastest accepted playback rate. Faster requests are clamped.
    ///
    /// Default: 2.0.
    #[serde(default = "default_max_playback_rate")]
    pub max_playback_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_secs: default_skip_secs(),
            long_skip_secs: default_long_skip_secs(),
            restart_threshold_secs: default_restart_threshold_secs(),
            checkpoint_bucket_secs: default_checkpoint_bucket_secs(),
            checkpoint_tick: default_checkpoint_tick(),
            default_volume: default_volume(),
            default_playback_rate: default_playback_rate(),
            unmute_volume: default_unmute_volume(),
            volume_step: default_volume_step(),
            min_playback_rate: default_min_playback_rate(),
            max_playback_rate: default_max_playback_rate(),
        }
    }
}

impl PlayerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.skip_secs.is_finite() && self.skip_secs > 0.0) {
            return Err("skip_secs must be > 0".to_string());
        }

        if !(self.long_skip_secs.is_finite() && self.long_skip_secs >= self.skip_secs) {
            return Err("long_skip_secs cannot be shorter than skip_secs".to_string());
        }

        if !(self.restart_threshold_secs.is_finite() && self.restart_threshold_secs >= 0.0) {
            return Err("restart_threshold_secs must be >= 0".to_string());
        }

        if !(self.checkpoint_bucket_secs.is_finite() && self.checkpoint_bucket_secs > 0.0) {
            return Err("checkpoint_bucket_secs must be > 0".to_string());
        }

        if self.checkpoint_tick.is_zero() {
            return Err("checkpoint_tick must be > 0".to_string());
        }

        for (name, value) in [
            ("default_volume", self.default_volume),
            ("unmute_volume", self.unmute_volume),
            ("volume_step", self.volume_step),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }

        if !(self.min_playback_rate.is_finite() && self.min_playback_rate > 0.0) {
            return Err("min_playback_rate must be > 0".to_string());
        }

        if !(self.max_playback_rate.is_finite() && self.max_playback_rate >= self.min_playback_rate)
        {
            return Err("max_playback_rate cannot be below min_playback_rate".to_string());
        }

        if !(self.min_playback_rate..=self.max_playback_rate).contains(&self.default_playback_rate)
        {
            return Err("default_playback_rate must lie within the playback rate bounds".to_string());
        }

        Ok(())
    }

    /// Clamp a (finite, positive) rate into the accepted range.
    pub fn clamp_playback_rate(&self, rate: f64) -> f64 {
        rate.clamp(self.min_playback_rate, self.max_playback_rate)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_skip_secs() -> f64 {
    15.0
}

fn default_long_skip_secs() -> f64 {
    30.0
}

fn default_restart_threshold_secs() -> f64 {
    3.0
}

fn default_checkpoint_bucket_secs() -> f64 {
    5.0
}

fn default_checkpoint_tick() -> Duration {
    Duration::from_secs(1)
}

fn default_volume() -> f64 {
    0.8
}

fn default_playback_rate() -> f64 {
    1.0
}

fn default_unmute_volume() -> f64 {
    0.8
}

fn default_volume_step() -> f64 {
    0.1
}

fn default_min_playback_rate() -> f64 {
    0.5
}

fn default_max_playback_rate() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.skip_secs, 15.0);
        assert_eq!(config.long_skip_secs, 30.0);
        assert_eq!(config.checkpoint_tick, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: PlayerConfig = serde_json::from_str(r#"{"skip_secs": 10.0}"#).unwrap();
        assert_eq!(config.skip_secs, 10.0);
        assert_eq!(config.long_skip_secs, 30.0);
        assert_eq!(config.default_volume, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PlayerConfig {
            checkpoint_bucket_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config = PlayerConfig {
            default_volume: 1.5,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("default_volume"));

        config = PlayerConfig {
            min_playback_rate: 2.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_playback_rate() {
        let config = PlayerConfig::default();
        assert_eq!(config.clamp_playback_rate(0.1), 0.5);
        assert_eq!(config.clamp_playback_rate(1.25), 1.25);
        assert_eq!(config.clamp_playback_rate(16.0), 2.0);
    }
}
