//! # Progress Persister
//!
//! Best-effort checkpointing of listening progress to a remote store.
//!
//! Three kinds of save exist:
//! - **Checkpoints** while playing, at most one per position bucket
//!   (`floor(position / bucket_secs)`). Entering a new bucket, by playing on
//!   or by seeking, issues exactly one save.
//! - **Explicit saves** on pause.
//! - **Completion saves** when an episode plays to its end, always recorded
//!   at the full duration with `completed = true`.
//!
//! Explicit and completion saves are each followed by one `record_play`
//! attempt for analytics. Every call runs on its own spawned task and every
//! failure is logged and dropped: progress never blocks or fails playback.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest},
};
use core_runtime::config::join_url;
use core_runtime::events::{CoreEvent, EventBus, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::EpisodeId;

/// API path progress updates are posted to.
pub const PROGRESS_PATH: &str = "/playback/progress";

/// Remote store for listening progress.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Store the position reached in an episode. `progress_secs` is never
    /// negative.
    async fn save_progress(
        &self,
        episode_id: &EpisodeId,
        progress_secs: f64,
        completed: bool,
    ) -> Result<()>;

    /// Count one play of the episode.
    async fn record_play(&self, episode_id: &EpisodeId) -> Result<()>;
}

/// JSON body of a progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub episode_id: String,
    pub progress_seconds: f64,
    pub completed: bool,
}

// ============================================================================
// Persister
// ============================================================================

/// Decides when progress is saved and dispatches the saves.
pub struct ProgressPersister {
    sink: Arc<dyn ProgressSink>,
    bucket_secs: f64,
    last_checkpoint: Option<(EpisodeId, u64)>,
    events: Option<EventBus>,
}

impl ProgressPersister {
    pub fn new(sink: Arc<dyn ProgressSink>, bucket_secs: f64) -> Self {
        Self {
            sink,
            bucket_secs,
            last_checkpoint: None,
            events: None,
        }
    }

    /// Publish save outcomes as [`ProgressEvent`]s.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Forget the last checkpoint bucket. Called when the episode changes.
    pub fn reset(&mut self) {
        self.last_checkpoint = None;
    }

    /// Save a checkpoint if `position_secs` falls in a bucket not yet saved
    /// for `episode_id`.
    ///
    /// Returns the handle of the spawned save, or `None` when the bucket was
    /// already covered.
    pub fn checkpoint(
        &mut self,
        episode_id: &EpisodeId,
        position_secs: f64,
    ) -> Option<JoinHandle<()>> {
        let position = sanitize_position(position_secs);
        let bucket = (position / self.bucket_secs).floor() as u64;

        if let Some((last_episode, last_bucket)) = &self.last_checkpoint {
            if last_episode == episode_id && *last_bucket == bucket {
                return None;
            }
        }
        self.last_checkpoint = Some((episode_id.clone(), bucket));

        debug!(episode_id = %episode_id, position, bucket, "Progress checkpoint");
        Some(self.spawn_save(episode_id.clone(), position, false, false))
    }

    /// Save the position on an explicit user action (pause).
    pub fn save(&self, episode_id: &EpisodeId, position_secs: f64) -> JoinHandle<()> {
        let position = sanitize_position(position_secs);
        self.spawn_save(episode_id.clone(), position, false, true)
    }

    /// Record that the episode played to its end.
    pub fn complete(&self, episode_id: &EpisodeId, duration_secs: f64) -> JoinHandle<()> {
        let duration = sanitize_position(duration_secs);
        self.spawn_save(episode_id.clone(), duration, true, true)
    }

    fn spawn_save(
        &self,
        episode_id: EpisodeId,
        position: f64,
        completed: bool,
        record_play: bool,
    ) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let events = self.events.clone();

        tokio::spawn(async move {
            let publish = |event: ProgressEvent| {
                if let Some(bus) = &events {
                    bus.publish(CoreEvent::Progress(event));
                }
            };

            match sink.save_progress(&episode_id, position, completed).await {
                Ok(()) => publish(ProgressEvent::Saved {
                    episode_id: episode_id.to_string(),
                    position_ms: (position * 1000.0).round() as u64,
                    completed,
                }),
                Err(e) => {
                    warn!(episode_id = %episode_id, error = %e, "Failed to save progress");
                    publish(ProgressEvent::SaveFailed {
                        episode_id: episode_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }

            if !record_play {
                return;
            }

            match sink.record_play(&episode_id).await {
                Ok(()) => publish(ProgressEvent::PlayRecorded {
                    episode_id: episode_id.to_string(),
                }),
                Err(e) => {
                    warn!(episode_id = %episode_id, error = %e, "Failed to record play");
                    publish(ProgressEvent::PlayRecordFailed {
                        episode_id: episode_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        })
    }
}

fn sanitize_position(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(0.0)
    } else {
        0.0
    }
}

// ============================================================================
// HTTP Sink
// ============================================================================

/// Progress sink posting to the podcast API.
///
/// Progress goes to `POST {api_base}/playback/progress` with a
/// [`ProgressUpdate`] body. The API counts a play for every progress update
/// it accepts, so `record_play` only issues a request when a separate play
/// endpoint has been configured with [`with_play_endpoint`].
///
/// [`with_play_endpoint`]: HttpProgressSink::with_play_endpoint
pub struct HttpProgressSink {
    http: Arc<dyn HttpClient>,
    progress_url: String,
    play_url: Option<String>,
    bearer_token: RwLock<Option<String>>,
}

impl HttpProgressSink {
    pub fn new(http: Arc<dyn HttpClient>, api_base_url: &str) -> Self {
        Self {
            http,
            progress_url: join_url(api_base_url, PROGRESS_PATH),
            play_url: None,
            bearer_token: RwLock::new(None),
        }
    }

    /// Post `{ "episode_id": .. }` to `url` on every `record_play`.
    pub fn with_play_endpoint(mut self, url: impl Into<String>) -> Self {
        self.play_url = Some(url.into());
        self
    }

    /// Set or clear the credential sent with every request.
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self
            .bearer_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let token = self
            .bearer_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match token {
            Some(token) => request.bearer_token(token),
            None => request,
        }
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<()> {
        let request = self.authorize(HttpRequest::new(HttpMethod::Post, url).json(body)?);
        let response = self.http.execute(request).await?;

        if response.is_success() {
            return Ok(());
        }

        let message = match response.json::<ApiErrorBody>() {
            Ok(body) => format!("{} returned HTTP {}: {}", url, response.status, body.error),
            Err(_) => format!("{} returned HTTP {}", url, response.status),
        };
        if response.is_server_error() {
            Err(BridgeError::NotAvailable(message))
        } else {
            Err(BridgeError::OperationFailed(message))
        }
    }
}

/// Error payload returned by the API alongside a non-2xx status.
#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Serialize)]
struct PlayRecord<'a> {
    episode_id: &'a str,
}

#[async_trait]
impl ProgressSink for HttpProgressSink {
    async fn save_progress(
        &self,
        episode_id: &EpisodeId,
        progress_secs: f64,
        completed: bool,
    ) -> Result<()> {
        let body = ProgressUpdate {
            episode_id: episode_id.to_string(),
            progress_seconds: progress_secs,
            completed,
        };
        self.post(&self.progress_url, &body).await
    }

    async fn record_play(&self, episode_id: &EpisodeId) -> Result<()> {
        match &self.play_url {
            Some(url) => {
                let body = PlayRecord {
                    episode_id: episode_id.as_str(),
                };
                self.post(url, &body).await
            }
            None => {
                debug!(episode_id = %episode_id, "Play counted by the progress endpoint");
                Ok(())
            }
        }
    }
}
