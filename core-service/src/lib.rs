//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media element,
//! HTTP, settings, audio storage) and the access lookups into the shared
//! podcast core. It exposes two surfaces:
//!
//! - a [`PlayerHandle`] driving the playback session, with progress reported
//!   to the podcast API
//! - [`CoreService::serve_audio`], the resource fetch boundary that runs the
//!   access gate before any audio byte leaves storage
//!
//! Desktop apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and start through [`bootstrap_desktop`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    media::{MediaElement, MediaEventReceiver},
    storage::{AudioObject, AudioStore},
    time::{Clock, SystemClock},
};
use core_auth::{
    AccessError, AccessGate, AccessGrant, CatalogLookup, CredentialVerifier, SubscriptionLookup,
};
use core_playback::{
    HttpProgressSink, PlaybackError, PlaybackSession, PlayerConfig, PlayerHandle, PlayerPreferences,
    PlayerService, ProgressPersister,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::strip_path;
use tracing::{debug, info, instrument, warn};

/// Cache lifetime advertised for served audio, one year.
const AUDIO_CACHE_MAX_AGE_SECS: u64 = 31_536_000;

/// Lookups the access gate consults.
#[derive(Clone)]
pub struct AccessLookups {
    pub catalog: Arc<dyn CatalogLookup>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub subscriptions: Arc<dyn SubscriptionLookup>,
}

impl AccessLookups {
    pub fn new(
        catalog: Arc<dyn CatalogLookup>,
        verifier: Arc<dyn CredentialVerifier>,
        subscriptions: Arc<dyn SubscriptionLookup>,
    ) -> Self {
        Self {
            catalog,
            verifier,
            subscriptions,
        }
    }
}

/// Aggregated handle to all dependencies the core requires.
pub struct CoreDependencies {
    pub config: CoreConfig,
    pub player: PlayerConfig,
    pub media: Arc<dyn MediaElement>,
    pub media_events: MediaEventReceiver,
    pub access: AccessLookups,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle with the default player tuning and the
    /// system clock.
    pub fn new(
        config: CoreConfig,
        media: Arc<dyn MediaElement>,
        media_events: MediaEventReceiver,
        access: AccessLookups,
    ) -> Self {
        Self {
            config,
            player: PlayerConfig::default(),
            media,
            media_events,
            access,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_player_config(mut self, player: PlayerConfig) -> Self {
        self.player = player;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Audio bytes cleared for delivery, with the grant that allowed them.
#[derive(Debug, Clone)]
pub struct ServedAudio {
    pub object: AudioObject,
    pub grant: AccessGrant,
}

impl ServedAudio {
    /// Response headers for an HTTP host.
    ///
    /// Premium audio is marked `private` so shared caches never hand it to
    /// another listener.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let scope = if self.grant.premium {
            "private"
        } else {
            "public"
        };
        vec![
            ("Content-Type", self.object.content_type.clone()),
            ("Content-Length", self.object.size.to_string()),
            ("Accept-Ranges", "bytes".to_string()),
            (
                "Cache-Control",
                format!("{}, max-age={}", scope, AUDIO_CACHE_MAX_AGE_SECS),
            ),
        ]
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    player: PlayerHandle,
    gate: Arc<AccessGate>,
    audio_store: Arc<dyn AudioStore>,
    progress: Arc<HttpProgressSink>,
    events: EventBus,
    config: Arc<CoreConfig>,
}

impl CoreService {
    /// Wire the dependencies together and spawn the player task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(deps: CoreDependencies) -> Result<Self> {
        let CoreDependencies {
            config,
            player,
            media,
            media_events,
            access,
            clock,
        } = deps;

        config.validate()?;
        player
            .validate()
            .map_err(PlaybackError::InvalidConfig)?;

        let events = EventBus::new(config.event_buffer_size);

        let progress = Arc::new(HttpProgressSink::new(
            Arc::clone(&config.http_client),
            &config.api_base_url,
        ));
        let persister = ProgressPersister::new(progress.clone(), player.checkpoint_bucket_secs)
            .with_event_bus(events.clone());

        let session = PlaybackSession::new(media, player)?
            .with_preferences(PlayerPreferences::new(Arc::clone(&config.settings_store)))
            .with_progress(persister)
            .with_event_bus(events.clone());
        let player = PlayerService::spawn(session, media_events);

        let gate = AccessGate::new(access.catalog, access.verifier, access.subscriptions, clock)
            .with_event_bus(events.clone());

        info!(api = %config.api_base_url, "Core service started");
        Ok(Self {
            player,
            gate: Arc::new(gate),
            audio_store: Arc::clone(&config.audio_store),
            progress,
            events,
            config: Arc::new(config),
        })
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Credential attached to progress reports. `None` reports anonymously.
    pub fn set_bearer_token(&self, token: Option<String>) {
        debug!(signed_in = token.is_some(), "Progress credential updated");
        self.progress.set_bearer_token(token);
    }

    /// Fetch the audio object stored under `resource` for the caller holding
    /// `authorization` (the raw `Authorization` header, if any).
    ///
    /// The access gate runs first on every call. A granted resource missing
    /// from storage is reported as not found; a storage failure as a backend
    /// error.
    #[instrument(skip(self, authorization), fields(has_credential = authorization.is_some()))]
    pub async fn serve_audio(
        &self,
        resource: &str,
        authorization: Option<&str>,
    ) -> core_auth::Result<ServedAudio> {
        let grant = self.gate.authorize(resource, authorization).await?;

        match self.audio_store.get_object(resource).await {
            Ok(Some(object)) => {
                debug!(
                    file = %strip_path(resource),
                    size = object.size,
                    premium = grant.premium,
                    "Serving audio"
                );
                Ok(ServedAudio { object, grant })
            }
            Ok(None) => Err(AccessError::NotFound {
                resource: resource.to_string(),
            }),
            Err(e) => {
                warn!(error = %e, "Audio storage failed");
                Err(AccessError::Backend(e.to_string()))
            }
        }
    }
}

/// Start the core with desktop bridges and a headless media element.
///
/// `config` supplies the HTTP client, settings store and audio store (the
/// builder fills desktop defaults under this feature).
///
/// ```no_run
/// # async fn example(access: core_service::AccessLookups) -> core_service::Result<()> {
/// use core_runtime::config::CoreConfig;
///
/// let config = CoreConfig::builder()
///     .api_base_url("https://podcasts.example.com/api")
///     .audio_root("/var/lib/podcasts/audio")
///     .build()?;
/// let core = core_service::bootstrap_desktop(config, access)?;
/// core.player().play_next().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub fn bootstrap_desktop(config: CoreConfig, access: AccessLookups) -> Result<CoreService> {
    let (events_tx, events_rx) = bridge_traits::media::media_event_channel();
    let media = Arc::new(bridge_desktop::HeadlessMediaElement::new(events_tx));
    CoreService::start(CoreDependencies::new(config, media, events_rx, access))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::storage::AudioObject;
    use bytes::Bytes;

    fn served(premium: bool) -> ServedAudio {
        ServedAudio {
            object: AudioObject::new(Bytes::from_static(b"ID3"), "audio/mpeg"),
            grant: AccessGrant {
                resource: "ep.mp3".to_string(),
                premium,
                user: None,
            },
        }
    }

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn test_served_audio_headers() {
        let headers = served(false).headers();
        assert_eq!(header(&headers, "Content-Type"), Some("audio/mpeg"));
        assert_eq!(header(&headers, "Content-Length"), Some("3"));
        assert_eq!(header(&headers, "Accept-Ranges"), Some("bytes"));
        assert_eq!(
            header(&headers, "Cache-Control"),
            Some("public, max-age=31536000")
        );
    }

    #[test]
    fn test_premium_audio_is_not_publicly_cacheable() {
        let headers = served(true).headers();
        assert_eq!(
            header(&headers, "Cache-Control"),
            Some("private, max-age=31536000")
        );
    }

    #[test]
    fn test_runtime_capability_error_maps_to_core_error() {
        let err: CoreError = core_runtime::Error::CapabilityMissing {
            capability: "AudioStore".into(),
            message: "missing".into(),
        }
        .into();
        assert!(matches!(err, CoreError::CapabilityMissing { .. }));
    }
}
