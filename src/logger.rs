//! Leveled, component-scoped structured logging.
//!
//! Every component creates its own [`Logger`] once and keeps it for the
//! process lifetime. A line looks like:
//!
//! ```text
//! [2024-05-17T09:30:00.250Z] WARN [fetch_with_retry:retry] HTTP 503, retrying in 1000ms (attempt 1/3)
//! ```
//!
//! Metadata never goes into the line itself; it is handed to the
//! [`LogSink`] separately so structured processors can parse it.

use std::{
    fmt,
    sync::{Arc, Mutex, OnceLock},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::{LogLevel, LoggerConfig, Metadata};

/// Source of log timestamps.
pub type Clock = fn() -> DateTime<Utc>;

/// Output channel with one method per level.
///
/// Implementations must not panic and must not block for long; the logger
/// calls them inline on the caller's task.
pub trait LogSink: Send + Sync {
    fn debug(&self, line: &str, metadata: Option<&Metadata>);
    fn info(&self, line: &str, metadata: Option<&Metadata>);
    fn warn(&self, line: &str, metadata: Option<&Metadata>);
    fn error(&self, line: &str, metadata: Option<&Metadata>);
}

/// Forwards each level to the matching `tracing` macro.
///
/// Metadata is rendered as JSON into a `metadata` field. If rendering fails
/// the line is emitted without it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

/// Renders a metadata value as JSON, or `None` if it cannot be represented.
fn render_json<T: Serialize + ?Sized>(value: Option<&T>) -> Option<String> {
    value.and_then(|value| serde_json::to_string(value).ok())
}

macro_rules! forward_to_tracing {
    ($level:expr, $line:expr, $metadata:expr) => {
        match render_json($metadata) {
            Some(meta) => tracing::event!($level, metadata = %meta, "{}", $line),
            None => tracing::event!($level, "{}", $line),
        }
    };
}

impl LogSink for TracingSink {
    fn debug(&self, line: &str, metadata: Option<&Metadata>) {
        forward_to_tracing!(tracing::Level::DEBUG, line, metadata);
    }

    fn info(&self, line: &str, metadata: Option<&Metadata>) {
        forward_to_tracing!(tracing::Level::INFO, line, metadata);
    }

    fn warn(&self, line: &str, metadata: Option<&Metadata>) {
        forward_to_tracing!(tracing::Level::WARN, line, metadata);
    }

    fn error(&self, line: &str, metadata: Option<&Metadata>) {
        forward_to_tracing!(tracing::Level::ERROR, line, metadata);
    }
}

/// One captured line from a [`MemorySink`].
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// Sink method that received the line.
    pub level: LogLevel,
    pub line: String,
    pub metadata: Option<Metadata>,
}

/// Sink that keeps every line in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of lines received for `level`.
    pub fn count(&self, level: LogLevel) -> usize {
        self.records()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }

    fn push(&self, level: LogLevel, line: &str, metadata: Option<&Metadata>) {
        let record = LogRecord {
            level,
            line: line.to_owned(),
            metadata: metadata.cloned(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

impl LogSink for MemorySink {
    fn debug(&self, line: &str, metadata: Option<&Metadata>) {
        self.push(LogLevel::Debug, line, metadata);
    }

    fn info(&self, line: &str, metadata: Option<&Metadata>) {
        self.push(LogLevel::Info, line, metadata);
    }

    fn warn(&self, line: &str, metadata: Option<&Metadata>) {
        self.push(LogLevel::Warn, line, metadata);
    }

    fn error(&self, line: &str, metadata: Option<&Metadata>) {
        self.push(LogLevel::Error, line, metadata);
    }
}

/// Action and optional metadata for the combined-context call form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogContext {
    pub action: String,
    pub metadata: Option<Metadata>,
}

impl LogContext {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Logger bound to one component name.
#[derive(Clone)]
pub struct Logger {
    component: Arc<str>,
    threshold: LogLevel,
    sink: Arc<dyn LogSink>,
    clock: Clock,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates a logger that emits every level through [`TracingSink`].
    pub fn new(component: impl AsRef<str>) -> Self {
        Self::with_config(component, &LoggerConfig::default())
    }

    /// Creates a logger using the threshold from `config`.
    pub fn with_config(component: impl AsRef<str>, config: &LoggerConfig) -> Self {
        Self {
            component: Arc::from(component.as_ref()),
            threshold: config.threshold,
            sink: Arc::new(TracingSink),
            clock: Utc::now,
        }
    }

    pub fn with_threshold(mut self, threshold: LogLevel) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the timestamp source, e.g. with a fixed clock in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Returns `true` if a message at `level` would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.priority() >= self.threshold.priority()
    }

    pub fn debug(&self, action: &str, message: &str, metadata: Option<&Metadata>) {
        self.emit(LogLevel::Debug, action, message, metadata);
    }

    pub fn info(&self, action: &str, message: &str, metadata: Option<&Metadata>) {
        self.emit(LogLevel::Info, action, message, metadata);
    }

    pub fn warn(&self, action: &str, message: &str, metadata: Option<&Metadata>) {
        self.emit(LogLevel::Warn, action, message, metadata);
    }

    pub fn error(&self, action: &str, message: &str, metadata: Option<&Metadata>) {
        self.emit(LogLevel::Error, action, message, metadata);
    }

    /// Combined-context form: `logger.log(LogLevel::Error, "Refresh failed", &ctx)`.
    pub fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        self.emit(level, &context.action, message, context.metadata.as_ref());
    }

    fn emit(&self, level: LogLevel, action: &str, message: &str, metadata: Option<&Metadata>) {
        // Checked before the clock is read so suppressed calls cost nothing.
        if !self.enabled(level) {
            return;
        }

        let line = format_line((self.clock)(), level, &self.component, action, message);
        match level {
            LogLevel::Debug => self.sink.debug(&line, metadata),
            LogLevel::Info => self.sink.info(&line, metadata),
            LogLevel::Warn => self.sink.warn(&line, metadata),
            LogLevel::Error => self.sink.error(&line, metadata),
        }
    }
}

fn format_line(
    now: DateTime<Utc>,
    level: LogLevel,
    component: &str,
    action: &str,
    message: &str,
) -> String {
    format!(
        "[{}] {level} [{component}:{action}] {message}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Process-wide logger bound to the `app` component, for ad hoc use.
pub fn default_logger() -> &'static Logger {
    static DEFAULT: OnceLock<Logger> = OnceLock::new();
    DEFAULT.get_or_init(|| Logger::new("app"))
}
