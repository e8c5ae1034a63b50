//! # Event Bus System
//!
//! Typed event broadcasting between the playback core and the UI layer, built
//! on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: strongly-typed enums per domain (playback, progress
//!   persistence, access control)
//! - **EventBus**: central broadcast channel for publishing events
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌─────────────────┐   emit    ┌──────────┐  subscribe  ┌────────────┐
//! │ PlayerService   ├──────────>│          ├────────────>│ UI layer   │
//! └─────────────────┘           │ EventBus │             └────────────┘
//! ┌─────────────────┐   emit    │          │  subscribe  ┌────────────┐
//! │ AccessGate      ├──────────>│          ├────────────>│ Audit log  │
//! └─────────────────┘           └──────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Started {
//!     episode_id: "ep-1".to_string(),
//!     title: "Pilot".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Publishers use [`EventBus::publish`] when nobody listening is normal (the
//! player emits position updates whether or not a UI is attached).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Transport and queue changes in the playback session
    Playback(PlaybackEvent),
    /// Progress checkpoint outcomes
    Progress(ProgressEvent),
    /// Access gate decisions
    Access(AccessEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Progress(e) => e.description(),
            CoreEvent::Access(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Progress(ProgressEvent::SaveFailed { .. })
            | CoreEvent::Progress(ProgressEvent::PlayRecordFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Access(AccessEvent::Denied { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new episode started playing.
    Started {
        episode_id: String,
        title: String,
    },
    /// Playback paused.
    Paused {
        episode_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// Playback resumed after pause or stop.
    Resumed {
        episode_id: String,
        position_ms: u64,
    },
    /// Playback stopped (queue exhausted or load failure).
    Stopped { episode_id: String },
    /// Episode played through to the end.
    Completed { episode_id: String },
    /// Position changed (seek or natural progression).
    PositionChanged {
        episode_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Queue contents changed.
    QueueChanged { length: usize },
    /// Playback error occurred.
    Error {
        episode_id: Option<String>,
        message: String,
        /// Whether retrying the same command may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Episode completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::QueueChanged { .. } => "Queue changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Progress Events
// ============================================================================

/// Outcomes of best-effort progress persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ProgressEvent {
    /// A progress save reached the remote store.
    Saved {
        episode_id: String,
        position_ms: u64,
        completed: bool,
    },
    /// A progress save failed and was dropped.
    SaveFailed { episode_id: String, message: String },
    /// A play was recorded for analytics.
    PlayRecorded { episode_id: String },
    /// Recording a play failed and was dropped.
    PlayRecordFailed { episode_id: String, message: String },
}

impl ProgressEvent {
    fn description(&self) -> &str {
        match self {
            ProgressEvent::Saved { .. } => "Progress saved",
            ProgressEvent::SaveFailed { .. } => "Progress save failed",
            ProgressEvent::PlayRecorded { .. } => "Play recorded",
            ProgressEvent::PlayRecordFailed { .. } => "Play record failed",
        }
    }
}

// ============================================================================
// Access Events
// ============================================================================

/// Access gate decisions for audio resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AccessEvent {
    Granted {
        resource: String,
        premium: bool,
    },
    Denied {
        resource: String,
        /// HTTP status the denial maps to (401, 403, 404).
        status: u16,
        reason: String,
    },
}

impl AccessEvent {
    fn description(&self) -> &str {
        match self {
            AccessEvent::Granted { .. } => "Audio access granted",
            AccessEvent::Denied { .. } => "Audio access denied",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another producer on the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus. Subscribers that fall more than `capacity`
    /// events behind receive `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, ignoring the absence of subscribers.
    pub fn publish(&self, event: CoreEvent) {
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let access_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Access(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Started {
            episode_id: id.to_string(),
            title: format!("Episode {}", id),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors_but_publish_does_not() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("ep-1")).is_err());
        bus.publish(started("ep-1"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Access(AccessEvent::Denied {
            resource: "premium.mp3".to_string(),
            status: 403,
            reason: "Active subscription required".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Progress(_)));

        bus.publish(started("ep-1"));
        let saved = CoreEvent::Progress(ProgressEvent::Saved {
            episode_id: "ep-1".to_string(),
            position_ms: 5_000,
            completed: false,
        });
        bus.publish(saved.clone());

        assert_eq!(stream.recv().await.unwrap(), saved);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.publish(started(&format!("ep-{}", i)));
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            episode_id: None,
            message: "decode failed".to_string(),
            recoverable: false,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let save_failed = CoreEvent::Progress(ProgressEvent::SaveFailed {
            episode_id: "ep-1".to_string(),
            message: "offline".to_string(),
        });
        assert_eq!(save_failed.severity(), EventSeverity::Warning);

        assert_eq!(started("ep-1").severity(), EventSeverity::Info);

        let tick = CoreEvent::Playback(PlaybackEvent::PositionChanged {
            episode_id: "ep-1".to_string(),
            position_ms: 5_000,
            duration_ms: 600_000,
        });
        assert_eq!(tick.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Progress(ProgressEvent::Saved {
            episode_id: "ep-123".to_string(),
            position_ms: 10_000,
            completed: true,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ep-123"));
        assert!(json.contains(r#""type":"Progress""#));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
