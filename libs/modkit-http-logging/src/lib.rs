#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP wire logging for `ModKit` clients
//!
//! This crate provides a tower middleware that records every exchange
//! passing through an HTTP client stack:
//! - Request and response lines with the elapsed time
//! - Headers, with configurable redaction
//! - Plaintext bodies, decoded with the declared charset
//! - Failures, logged once and propagated unchanged
//!
//! How much is logged is decided per exchange by the [`LogSink`]. The
//! default [`TracingSink`] follows the `tracing` subscriber filter for the
//! `http.logging.wire` target: `info` logs lines and headers, `debug` adds
//! bodies.
//!
//! Bodies that are logged are buffered in memory and replayed to the caller
//! byte-for-byte. Compressed and binary bodies are never printed.
//!
//! # Example
//!
//! ```ignore
//! use modkit_http_logging::{HttpLoggingConfig, HttpLoggingLayer};
//! use tower::ServiceBuilder;
//!
//! let config = HttpLoggingConfig::default().redact_header("authorization");
//! let service = ServiceBuilder::new()
//!     .layer(HttpLoggingLayer::from_config(&config)?)
//!     .service(client);
//! ```

mod body;
mod config;
mod error;
pub mod inspect;
mod layer;
mod sink;
mod text;

pub use body::{BoxError, ReplayBody, ResponseBody};
pub use config::{DEFAULT_LOGGER_NAME, HttpLoggingConfig, REDACTED_VALUE};
pub use error::HttpLoggingError;
pub use layer::{HttpLogger, HttpLoggingLayer, HttpLoggingService, NegotiatedProtocol};
pub use sink::{LogSink, TracingSink, Verbosity, WireLevel};
