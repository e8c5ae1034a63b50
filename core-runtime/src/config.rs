//! # Core Configuration
//!
//! Builder-based configuration for the podcast core.
//!
//! `CoreConfig` carries the host bridges every service needs plus the API
//! endpoint progress is reported to. The builder fails fast: a missing bridge
//! surfaces as [`Error::CapabilityMissing`] at build time, never as a panic
//! on first use.
//!
//! ## Required
//!
//! - `api_base_url` - base URL of the podcast API (progress and play records)
//!
//! ## Bridges (injected, or desktop defaults with `desktop-shims`)
//!
//! - `HttpClient` - desktop default: reqwest
//! - `SettingsStore` - desktop default: JSON file at `settings_path`, or
//!   `<config dir>/podcast-core/settings.json`
//! - `AudioStore` - desktop default: directory at `audio_root`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .http_client(Arc::new(MyHttpClient))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .audio_store(Arc::new(MyBucket))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioStore, HttpClient, SettingsStore};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration. Construct through [`CoreConfigBuilder`].
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the podcast API, without trailing slash.
    pub api_base_url: String,

    /// Directory holding episode audio for the desktop audio store.
    pub audio_root: Option<PathBuf>,

    /// Location of the desktop settings file.
    pub settings_path: Option<PathBuf>,

    pub http_client: Arc<dyn HttpClient>,

    /// User preference storage (volume, playback rate).
    pub settings_store: Arc<dyn SettingsStore>,

    /// Object storage audio bytes are served from.
    pub audio_store: Arc<dyn AudioStore>,

    /// Capacity of the event bus broadcast channel.
    pub event_buffer_size: usize,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("audio_root", &self.audio_root)
            .field("settings_path", &self.settings_path)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("audio_store", &"AudioStore { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks values the builder cannot enforce through types.
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "API base URL must use http or https: {}",
                self.api_base_url
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }

    /// Joins `path` onto the API base URL.
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }
}

/// Joins a base URL and a path with exactly one slash between them.
///
/// ```
/// # use core_runtime::config::join_url;
/// assert_eq!(
///     join_url("https://api.example.com/", "/playback/progress"),
///     "https://api.example.com/playback/progress"
/// );
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for progress reporting. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Mobile and web: inject the platform networking stack."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_path: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for player preferences. \
                  Desktop: enable the 'desktop-shims' feature to use JsonSettingsStore. \
                  Web: inject a localStorage-backed store."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(path: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonSettingsStore;

    let path = match path {
        Some(path) => path.clone(),
        None => JsonSettingsStore::default_path().ok_or_else(|| Error::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "No user config directory found. Set settings_path() explicitly."
                .to_string(),
        })?,
    };

    let store = JsonSettingsStore::open(&path).map_err(|e| {
        Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
    })?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_store(_root: Option<&PathBuf>) -> Result<Arc<dyn AudioStore>> {
    Err(Error::CapabilityMissing {
        capability: "AudioStore".to_string(),
        message: "AudioStore implementation is required to serve episode audio. \
                  Desktop: enable the 'desktop-shims' feature and set audio_root(). \
                  Server: inject the object storage bucket."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_store(root: Option<&PathBuf>) -> Result<Arc<dyn AudioStore>> {
    let root = root.ok_or_else(|| Error::CapabilityMissing {
        capability: "AudioStore".to_string(),
        message: "AudioStore implementation is required to serve episode audio. \
                  Set audio_root() to use the directory-backed FsAudioStore, \
                  or inject an AudioStore."
            .to_string(),
    })?;
    Ok(Arc::new(bridge_desktop::FsAudioStore::new(root.clone())))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    audio_root: Option<PathBuf>,
    settings_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    audio_store: Option<Arc<dyn AudioStore>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the API base URL. A trailing slash is dropped.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn audio_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.audio_root = Some(path.into());
        self
    }

    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn audio_store(mut self, store: Arc<dyn AudioStore>) -> Self {
        self.audio_store = Some(store);
        self
    }

    /// Default: 100 events.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Injected bridges always win over desktop defaults.
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self.api_base_url.ok_or_else(|| {
            Error::Config("API base URL is required. Use .api_base_url() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path.as_ref())?,
        };

        let audio_store = match self.audio_store {
            Some(store) => store,
            None => provide_default_audio_store(self.audio_root.as_ref())?,
        };

        let config = CoreConfig {
            api_base_url,
            audio_root: self.audio_root,
            settings_path: self.settings_path,
            http_client,
            settings_store,
            audio_store,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{AudioObject, BridgeError, HttpRequest, HttpResponse};

    type BridgeResult<T> = std::result::Result<T, BridgeError>;

    struct StubHttpClient;

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct StubSettingsStore;

    #[async_trait]
    impl SettingsStore for StubSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }

        async fn set_f64(&self, _key: &str, _value: f64) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_f64(&self, _key: &str) -> BridgeResult<Option<f64>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct StubAudioStore;

    #[async_trait]
    impl AudioStore for StubAudioStore {
        async fn get_object(&self, _key: &str) -> BridgeResult<Option<AudioObject>> {
            Ok(None)
        }

        async fn put_object(&self, _key: &str, _object: AudioObject) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .api_base_url("https://api.example.com/")
            .http_client(Arc::new(StubHttpClient))
            .settings_store(Arc::new(StubSettingsStore))
            .audio_store(Arc::new(StubAudioStore))
    }

    #[test]
    fn test_builder_requires_api_base_url() {
        let err = CoreConfig::builder()
            .http_client(Arc::new(StubHttpClient))
            .settings_store(Arc::new(StubSettingsStore))
            .audio_store(Arc::new(StubAudioStore))
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("API base URL is required"));
    }

    #[test]
    fn test_builder_with_injected_bridges() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(
            config.api_url("/playback/progress"),
            "https://api.example.com/playback/progress"
        );
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_reports_missing_settings_store() {
        let err = CoreConfig::builder()
            .api_base_url("https://api.example.com")
            .http_client(Arc::new(StubHttpClient))
            .audio_store(Arc::new(StubAudioStore))
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, message } => {
                assert_eq!(capability, "SettingsStore");
                assert!(message.contains("player preferences"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_reports_missing_http_client() {
        let err = CoreConfig::builder()
            .api_base_url("https://api.example.com")
            .settings_store(Arc::new(StubSettingsStore))
            .audio_store(Arc::new(StubAudioStore))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let err = complete_builder()
            .api_base_url("ftp://api.example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let err = complete_builder().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_event_buffer() {
        let err = complete_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h/", "/a"), "http://h/a");
        assert_eq!(join_url("http://h", "a"), "http://h/a");
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("api.example.com"));
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_fill_missing_bridges() {
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");

        let config = CoreConfig::builder()
            .api_base_url("http://localhost:8787")
            .settings_path(&settings_path)
            .audio_root(dir.path())
            .build()
            .unwrap();

        config.settings_store.set_f64("audioVolume", 0.4).await.unwrap();
        assert_eq!(
            config.settings_store.get_f64("audioVolume").await.unwrap(),
            Some(0.4)
        );
        assert!(config.audio_store.get_object("missing.mp3").await.unwrap().is_none());
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_audio_store_needs_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::builder()
            .api_base_url("http://localhost:8787")
            .settings_path(dir.path().join("settings.json"))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "AudioStore"));
    }
}
