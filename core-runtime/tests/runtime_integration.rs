//! Integration tests for the runtime building blocks shared by the services.

use bridge_traits::time::LogLevel;
use core_runtime::events::{
    AccessEvent, CoreEvent, EventBus, EventSeverity, EventStream, PlaybackEvent, ProgressEvent,
};
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_logging_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
}

#[test]
fn test_bearer_credentials_never_logged() {
    assert_eq!(redact_if_sensitive("authorization", "Bearer abc.def"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("session_token", "s3cr3t"), "[REDACTED]");

    let redacted = redact_if_sensitive("email", "host@podcast.example");
    assert!(!redacted.contains("podcast.example"));
}

#[test]
fn test_audio_keys_are_stripped_to_file_names() {
    assert_eq!(strip_path("/srv/bucket/audio/ep-7.mp3"), "ep-7.mp3");
    assert_eq!(strip_path(""), "");
}

#[tokio::test]
async fn test_ui_and_audit_subscribers_see_their_own_slices() {
    let bus = EventBus::default();
    let mut ui = EventStream::new(bus.subscribe())
        .filter(|event| matches!(event, CoreEvent::Playback(_)));
    let mut audit = EventStream::new(bus.subscribe())
        .filter(|event| event.severity() >= EventSeverity::Warning);

    bus.publish(CoreEvent::Playback(PlaybackEvent::Started {
        episode_id: "ep-1".to_string(),
        title: "Pilot".to_string(),
    }));
    bus.publish(CoreEvent::Access(AccessEvent::Denied {
        resource: "bonus.mp3".to_string(),
        status: 401,
        reason: "Authentication required".to_string(),
    }));
    bus.publish(CoreEvent::Progress(ProgressEvent::SaveFailed {
        episode_id: "ep-1".to_string(),
        message: "503".to_string(),
    }));

    let first = ui.recv().await.unwrap();
    assert_eq!(first.description(), "Playback started");
    assert!(ui.try_recv().is_none());

    assert!(matches!(
        audit.recv().await.unwrap(),
        CoreEvent::Access(AccessEvent::Denied { status: 401, .. })
    ));
    assert!(matches!(
        audit.recv().await.unwrap(),
        CoreEvent::Progress(ProgressEvent::SaveFailed { .. })
    ));
}

#[test]
fn test_playback_event_json_shape() {
    let event = CoreEvent::Playback(PlaybackEvent::Paused {
        episode_id: "ep-9".to_string(),
        position_ms: 42_000,
    });
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["type"], "Playback");
    assert_eq!(value["payload"]["event"], "Paused");
    assert_eq!(value["payload"]["position_ms"], 42_000);
}
