use crate::error::HttpLoggingError;
use http::header::HeaderName;
use serde::Deserialize;

/// Default logger name, also used as the `tracing` target of [`TracingSink`].
///
/// [`TracingSink`]: crate::TracingSink
pub const DEFAULT_LOGGER_NAME: &str = "http.logging.wire";

/// Placeholder printed instead of a redacted header value
pub const REDACTED_VALUE: &str = "[redacted]";

/// Configuration for the wire logging middleware
///
/// Deserializable so it can sit inside a module's config section:
///
/// ```ignore
/// http_logging:
///   logger_name: "billing.http.wire"
///   redact_headers: ["authorization", "cookie"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpLoggingConfig {
    /// Name reported with every logged line (default: `http.logging.wire`)
    pub logger_name: String,

    /// Header names (case-insensitive) whose values are replaced with
    /// [`REDACTED_VALUE`] in both request and response header lines.
    ///
    /// Empty by default, so every header is printed as received.
    pub redact_headers: Vec<String>,
}

impl Default for HttpLoggingConfig {
    fn default() -> Self {
        Self {
            logger_name: DEFAULT_LOGGER_NAME.to_owned(),
            redact_headers: Vec::new(),
        }
    }
}

impl HttpLoggingConfig {
    /// Set the logger name
    #[must_use]
    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    /// Add a header whose value should never be logged
    #[must_use]
    pub fn redact_header(mut self, name: impl Into<String>) -> Self {
        self.redact_headers.push(name.into());
        self
    }

    /// Check the configuration without building anything
    ///
    /// # Errors
    /// Returns `HttpLoggingError::InvalidLoggerName` for a blank logger name and
    /// `HttpLoggingError::InvalidHeaderName` for an unparseable redacted header.
    pub fn validate(&self) -> Result<(), HttpLoggingError> {
        if self.logger_name.trim().is_empty() {
            return Err(HttpLoggingError::InvalidLoggerName {
                name: self.logger_name.clone(),
            });
        }
        self.redacted_header_names()?;
        Ok(())
    }

    /// Parse `redact_headers` into header names
    ///
    /// # Errors
    /// Returns `HttpLoggingError::InvalidHeaderName` if any entry is not a valid
    /// header name.
    pub fn redacted_header_names(&self) -> Result<Vec<HeaderName>, HttpLoggingError> {
        self.redact_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().as_bytes()).map_err(HttpLoggingError::from)
            })
            .collect()
    }
}
