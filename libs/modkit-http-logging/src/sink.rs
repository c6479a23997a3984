use crate::config::DEFAULT_LOGGER_NAME;
use crate::error::HttpLoggingError;
use std::sync::Arc;

/// Severity of a single wire log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireLevel {
    /// Request/response lines and headers
    Info,
    /// Bodies
    Debug,
}

/// Destination for wire log lines.
///
/// The sink owns its own verbosity: the middleware asks [`LogSink::enabled`]
/// once per exchange and only formats lines the sink will accept.
pub trait LogSink: Send + Sync {
    /// Whether lines at `level` would be recorded
    fn enabled(&self, level: WireLevel) -> bool;

    /// Record one line
    fn log(&self, level: WireLevel, line: &str);
}

/// Verbosity of one intercepted exchange, resolved from the sink at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Nothing is logged; the middleware is a pass-through
    Off,
    /// Request/response lines and headers
    Info,
    /// Everything in `Info` plus request and response bodies
    Debug,
}

impl Verbosity {
    /// Ask the sink which levels it accepts
    #[must_use]
    pub fn of(sink: &dyn LogSink) -> Self {
        if sink.enabled(WireLevel::Debug) {
            Self::Debug
        } else if sink.enabled(WireLevel::Info) {
            Self::Info
        } else {
            Self::Off
        }
    }

    /// Whether headers (and request/response lines) are logged
    #[must_use]
    pub fn logs_headers(self) -> bool {
        self >= Self::Info
    }

    /// Whether bodies are logged
    #[must_use]
    pub fn logs_body(self) -> bool {
        self == Self::Debug
    }
}

/// [`LogSink`] backed by `tracing`.
///
/// Events are emitted with target `http.logging.wire`, so verbosity is
/// controlled by the subscriber filter, e.g. `RUST_LOG=http.logging.wire=debug`
/// to include bodies. Each event carries a `logger` field with the configured
/// logger name so several clients can share the target.
#[derive(Debug, Clone)]
pub struct TracingSink {
    name: Arc<str>,
}

impl TracingSink {
    /// Sink reporting under [`DEFAULT_LOGGER_NAME`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: Arc::from(DEFAULT_LOGGER_NAME),
        }
    }

    /// Sink reporting under a custom logger name
    ///
    /// # Errors
    /// Returns `HttpLoggingError::InvalidLoggerName` if `name` is blank.
    pub fn named(name: impl Into<String>) -> Result<Self, HttpLoggingError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HttpLoggingError::InvalidLoggerName { name });
        }
        Ok(Self {
            name: Arc::from(name),
        })
    }

    /// Logger name attached to each event
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for TracingSink {
    fn enabled(&self, level: WireLevel) -> bool {
        match level {
            WireLevel::Info => tracing::enabled!(target: DEFAULT_LOGGER_NAME, tracing::Level::INFO),
            WireLevel::Debug => {
                tracing::enabled!(target: DEFAULT_LOGGER_NAME, tracing::Level::DEBUG)
            }
        }
    }

    fn log(&self, level: WireLevel, line: &str) {
        let logger = &*self.name;
        match level {
            WireLevel::Info => tracing::info!(target: DEFAULT_LOGGER_NAME, logger, "{line}"),
            WireLevel::Debug => tracing::debug!(target: DEFAULT_LOGGER_NAME, logger, "{line}"),
        }
    }
}
