//! Storage Abstractions
//!
//! Key-value preference storage and the object store that holds episode
//! audio.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - Browser: localStorage
/// - Desktop: a JSON document in the user's config directory
/// - Mobile: UserDefaults / SharedPreferences
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_volume(store: &dyn SettingsStore, volume: f64) -> Result<()> {
///     store.set_f64("audioVolume", volume).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Store a floating-point value
    async fn set_f64(&self, key: &str, value: f64) -> Result<()>;

    /// Retrieve a floating-point value
    async fn get_f64(&self, key: &str) -> Result<Option<f64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Audio object returned by an [`AudioStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioObject {
    /// Raw audio bytes.
    pub body: Bytes,
    /// MIME type recorded at upload time, `audio/mpeg` when unknown.
    pub content_type: String,
    /// Size of `body` in bytes.
    pub size: u64,
}

impl AudioObject {
    pub fn new(body: Bytes, content_type: impl Into<String>) -> Self {
        let size = body.len() as u64;
        Self {
            body,
            content_type: content_type.into(),
            size,
        }
    }
}

/// Object storage holding uploaded episode audio (an R2/S3 bucket in
/// production, a directory on desktop).
///
/// Implementations only move bytes. Authorization happens before the store is
/// consulted.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Fetch an object by key. `Ok(None)` means the key does not exist.
    async fn get_object(&self, key: &str) -> Result<Option<AudioObject>>;

    /// Store an object under `key`, replacing any previous value.
    async fn put_object(&self, key: &str, object: AudioObject) -> Result<()>;
}
