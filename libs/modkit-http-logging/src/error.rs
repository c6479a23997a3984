use thiserror::Error;

/// Errors raised while constructing the logging middleware.
///
/// The middleware never fails a request on its own: errors from the wrapped
/// service pass through untouched, and malformed headers or bodies are
/// handled as "unknown". These variants only surface at construction time.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpLoggingError {
    /// No log sink was supplied
    #[error("Can't use a missing log sink")]
    MissingSink,

    /// Logger name is empty or whitespace only
    #[error("Invalid logger name '{name}': must not be blank")]
    InvalidLoggerName {
        /// The rejected name
        name: String,
    },

    /// A header listed for redaction is not a valid header name
    #[error("Invalid redacted header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
}
