//! Listener preferences carried across sessions.

use bridge_traits::{error::Result, storage::SettingsStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::PlayerConfig;

/// Settings key holding the last volume.
pub const VOLUME_KEY: &str = "audioVolume";
/// Settings key holding the last playback rate.
pub const PLAYBACK_RATE_KEY: &str = "playbackRate";

/// Volume and rate restored when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredPreferences {
    pub volume: f64,
    pub playback_rate: f64,
}

/// Reads and writes player preferences through the host settings store.
#[derive(Clone)]
pub struct PlayerPreferences {
    store: Arc<dyn SettingsStore>,
}

impl PlayerPreferences {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Load stored preferences, falling back to the configured defaults.
    ///
    /// Unreadable or out-of-range values are ignored. A stored rate outside
    /// the accepted bounds is clamped like a live request would be.
    pub async fn load(&self, config: &PlayerConfig) -> StoredPreferences {
        let volume = match self.store.get_f64(VOLUME_KEY).await {
            Ok(Some(v)) if v.is_finite() => v.clamp(0.0, 1.0),
            Ok(Some(v)) => {
                warn!(value = v, "Ignoring stored volume");
                config.default_volume
            }
            Ok(None) => config.default_volume,
            Err(e) => {
                warn!(error = %e, "Failed to read stored volume");
                config.default_volume
            }
        };

        let playback_rate = match self.store.get_f64(PLAYBACK_RATE_KEY).await {
            Ok(Some(r)) if r.is_finite() && r > 0.0 => config.clamp_playback_rate(r),
            Ok(Some(r)) => {
                warn!(value = r, "Ignoring stored playback rate");
                config.default_playback_rate
            }
            Ok(None) => config.default_playback_rate,
            Err(e) => {
                warn!(error = %e, "Failed to read stored playback rate");
                config.default_playback_rate
            }
        };

        debug!(volume, playback_rate, "Loaded player preferences");
        StoredPreferences {
            volume,
            playback_rate,
        }
    }

    pub async fn save_volume(&self, volume: f64) -> Result<()> {
        self.store.set_f64(VOLUME_KEY, volume).await
    }

    pub async fn save_playback_rate(&self, rate: f64) -> Result<()> {
        self.store.set_f64(PLAYBACK_RATE_KEY, rate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use mockall::mock;

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> Result<()>;
            async fn get_string(&self, key: &str) -> Result<Option<String>>;
            async fn set_bool(&self, key: &str, value: bool) -> Result<()>;
            async fn get_bool(&self, key: &str) -> Result<Option<bool>>;
            async fn set_f64(&self, key: &str, value: f64) -> Result<()>;
            async fn get_f64(&self, key: &str) -> Result<Option<f64>>;
            async fn delete(&self, key: &str) -> Result<()>;
            async fn has_key(&self, key: &str) -> Result<bool>;
            async fn list_keys(&self) -> Result<Vec<String>>;
        }
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let mut store = MockSettings::new();
        store.expect_get_f64().returning(|_| Ok(None));

        let prefs = PlayerPreferences::new(Arc::new(store))
            .load(&PlayerConfig::default())
            .await;
        assert_eq!(prefs.volume, 0.8);
        assert_eq!(prefs.playback_rate, 1.0);
    }

    #[tokio::test]
    async fn test_stored_values_are_sanitised() {
        let mut store = MockSettings::new();
        store.expect_get_f64().returning(|key| match key {
            VOLUME_KEY => Ok(Some(1.7)),
            PLAYBACK_RATE_KEY => Ok(Some(4.0)),
            _ => Ok(None),
        });

        let prefs = PlayerPreferences::new(Arc::new(store))
            .load(&PlayerConfig::default())
            .await;
        assert_eq!(prefs.volume, 1.0);
        assert_eq!(prefs.playback_rate, 2.0);
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_defaults() {
        let mut store = MockSettings::new();
        store
            .expect_get_f64()
            .returning(|_| Err(BridgeError::NotAvailable("settings".into())));

        let prefs = PlayerPreferences::new(Arc::new(store))
            .load(&PlayerConfig::default())
            .await;
        assert_eq!(prefs.volume, 0.8);
        assert_eq!(prefs.playback_rate, 1.0);
    }

    #[tokio::test]
    async fn test_save_uses_well_known_keys() {
        let mut store = MockSettings::new();
        store
            .expect_set_f64()
            .withf(|key, value| key == VOLUME_KEY && *value == 0.25)
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_f64()
            .withf(|key, value| key == PLAYBACK_RATE_KEY && *value == 1.5)
            .times(1)
            .returning(|_, _| Ok(()));

        let prefs = PlayerPreferences::new(Arc::new(store));
        prefs.save_volume(0.25).await.unwrap();
        prefs.save_playback_rate(1.5).await.unwrap();
    }
}
