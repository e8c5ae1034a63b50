//! # Logging & Tracing
//!
//! Structured logging for the playback core on top of `tracing`:
//! - pretty, JSON or compact output
//! - per-crate filtering (our crates at the configured level, HTTP stack at warn)
//! - redaction of bearer tokens and other credentials before they reach a host
//!   sink
//! - mirroring of events into a host [`LoggerSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug),
//! )?;
//!
//! tracing::info!(episode_id = "ep-1", "Playback started");
//! ```
//!
//! Modules never log raw `Authorization` headers. When a credential has to be
//! mentioned, pass it through [`redact_if_sensitive`] first; the sink layer
//! applies the same rule to every field it forwards when `redact_pii` is on.

use crate::error::{Error, Result};
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Crates whose level follows [`LoggingConfig::level`] in the default filter.
const WORKSPACE_TARGETS: &[&str] = &[
    "podcast_workspace",
    "bridge_traits",
    "bridge_desktop",
    "core_runtime",
    "core_auth",
    "core_playback",
    "core_service",
];

/// Dependencies that are noisy below warn.
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line, coloured
    Pretty,
    /// One JSON object per line
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for workspace crates
    pub level: LogLevel,
    /// Redact credential-like fields before forwarding to the sink
    pub redact_pii: bool,
    /// Full `EnvFilter` directive string; replaces the default filter
    pub filter: Option<String>,
    /// Host sink mirroring every event that passes the filter
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit for pretty output, span lists for JSON
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("redact_pii", &self.redact_pii)
            .field("filter", &self.filter)
            .field("logger_sink", &self.logger_sink.is_some())
            .finish()
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global `tracing` subscriber.
///
/// Call once at startup. A second call fails with [`Error::Config`] because a
/// global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let sink_layer = LoggerSinkLayer::new(config.logger_sink.clone(), config.redact_pii);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(&config))
        .with(sink_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn fmt_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => base
            .pretty()
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = level_directive(config.level);
            WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level))
                .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Layer that mirrors events into a [`LoggerSink`].
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact: bool,
}

impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>, redact: bool) -> Self {
        Self { sink, redact }
    }

    fn entry_for(&self, event: &Event<'_>, span_name: Option<&str>) -> LogEntry {
        let metadata = event.metadata();
        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(
            tracing_level_to_log_level(*metadata.level()),
            metadata.target(),
            message,
        );

        for (key, value) in visitor.fields {
            let value = if self.redact {
                redact_if_sensitive(&key, &value)
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }
        entry.span_id = span_name.map(str::to_string);
        entry
    }
}

impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        if tracing_level_to_log_level(*event.metadata().level()) < sink.min_level() {
            return;
        }

        let span = ctx.lookup_current();
        let entry = self.entry_for(event, span.as_ref().map(|s| s.name()));
        let sink = Arc::clone(sink);

        // Inside a runtime the sink runs on a task; outside one we block.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("LoggerSink error: {}", err);
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("LoggerSink error: {}", err);
                }
            }
        }
    }
}

#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Redact a field value when its name looks like a credential.
///
/// Email-shaped values keep their first character only.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("authorization", "Bearer abc"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("episode_id", "ep-1"), "ep-1");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
        "session",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|f| field_lower.contains(f)) {
        return "[REDACTED]".to_string();
    }

    match value.find('@') {
        Some(at_pos) if value[at_pos..].contains('.') => {
            format!("{}***@[REDACTED]", &value[..1.min(at_pos)])
        }
        _ => value.to_string(),
    }
}

/// Strip a path down to its final component.
///
/// The audio store logs object keys through this so that host directory
/// layouts stay out of log files.
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_pii_redaction(false)
            .with_filter("core_playback=trace")
            .with_spans(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.redact_pii);
        assert_eq!(config.filter.as_deref(), Some("core_playback=trace"));
        assert!(!config.enable_spans);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let filter = build_filter(&config).unwrap().to_string();
        assert!(filter.contains("core_playback=debug"));
        assert!(filter.contains("core_auth=debug"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_auth=trace");
        let filter = build_filter(&config).unwrap().to_string();
        assert!(filter.contains("core_auth=trace"));
        assert!(!filter.contains("core_playback"));
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LoggingConfig::default().with_filter("core_auth=[[[");
        assert!(matches!(build_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_redact_if_sensitive() {
        assert_eq!(redact_if_sensitive("access_token", "abc"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");

        let redacted = redact_if_sensitive("email", "listener@example.com");
        assert!(redacted.starts_with('l'));
        assert!(redacted.contains("[REDACTED]"));

        assert_eq!(redact_if_sensitive("resource", "ep-42.mp3"), "ep-42.mp3");
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/srv/audio/ep-1.mp3"), "ep-1.mp3");
        assert_eq!(strip_path("C:\\audio\\ep-1.mp3"), "ep-1.mp3");
        assert_eq!(strip_path("ep-1.mp3"), "ep-1.mp3");
        assert_eq!(strip_path("/var/audio/"), "");
    }

    #[test]
    fn test_sink_layer_forwards_and_redacts() {
        let sink = Arc::new(RecordingSink::default());
        let layer = LoggerSinkLayer::new(Some(sink.clone() as Arc<dyn LoggerSink>), true);
        let subscriber = tracing_subscriber::registry().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(target: "core_auth", bearer = "tok-123", resource = "ep-1.mp3", "checked");
        tracing::trace!(target: "core_auth", "below sink level");

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.target, "core_auth");
        assert_eq!(entry.message, "checked");
        assert_eq!(entry.fields.get("bearer").map(String::as_str), Some("[REDACTED]"));
        assert_eq!(entry.fields.get("resource").map(String::as_str), Some("ep-1.mp3"));
    }
}
