use crate::body::{ReplayBody, ResponseBody};
use crate::config::{HttpLoggingConfig, REDACTED_VALUE};
use crate::error::HttpLoggingError;
use crate::inspect::{content_length, has_body, is_encoded, is_plaintext};
use crate::sink::{LogSink, TracingSink, Verbosity, WireLevel};
use crate::text::Charset;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use http::{HeaderValue, Method, Request, Response, Uri, Version};
use http_body::Body;
use http_body_util::Full;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::{Layer, Service};
use tower_http::follow_redirect::RequestUri;

/// Protocol of the connection a request is sent over.
///
/// Connectors that know the negotiated protocol (e.g. via ALPN) insert this
/// into the request extensions. Without it the request line reports
/// `HTTP/1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedProtocol(pub Version);

/// Logs request and response lines, headers, and bodies to a [`LogSink`].
///
/// Verbosity is asked of the sink once per exchange:
///
/// - `Debug`: request and response lines, headers, and plaintext bodies.
/// - `Info`: request and response lines and headers.
/// - `Off`: nothing; the request is forwarded untouched.
///
/// ```text
/// --> POST http://example.com/greeting HTTP/1.1
/// Content-Type: text/plain
/// Content-Length: 3
/// host: example.com
///
/// Hi?
/// --> END POST (3-byte body)
/// <-- 200 OK http://example.com/greeting (took 22 ms )
/// content-type: text/plain
/// content-length: 6
///
/// Hello!
/// <-- END HTTP (6-byte body)
/// ```
///
/// Header names are printed in their normalized lowercase form. The response
/// returned to the caller is the one produced by `proceed`; when a body is
/// logged it is buffered and replayed byte-for-byte.
///
/// A request whose body is empty is logged as having no body: a `POST` with
/// an empty `Full` body prints `--> END POST`, without `Content-Length: 0` or
/// a `(0-byte body)` summary.
#[derive(Clone)]
pub struct HttpLogger {
    sink: Arc<dyn LogSink>,
    redacted: Arc<[HeaderName]>,
}

impl HttpLogger {
    /// Logger writing to a [`TracingSink`] under the default logger name
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink::new()))
    }

    /// Logger writing to the given sink
    #[must_use]
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            redacted: Arc::from([]),
        }
    }

    /// Logger writing to a [`TracingSink`] named after `config.logger_name`
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &HttpLoggingConfig) -> Result<Self, HttpLoggingError> {
        let sink = TracingSink::named(config.logger_name.as_str())?;
        Self::try_with_sink(Some(Arc::new(sink)), config)
    }

    /// Logger writing to an explicitly supplied sink
    ///
    /// # Errors
    /// Returns `HttpLoggingError::MissingSink` if `sink` is `None`, or an error
    /// if the configuration is invalid.
    pub fn try_with_sink(
        sink: Option<Arc<dyn LogSink>>,
        config: &HttpLoggingConfig,
    ) -> Result<Self, HttpLoggingError> {
        let sink = sink.ok_or(HttpLoggingError::MissingSink)?;
        config.validate()?;
        Ok(Self {
            sink,
            redacted: Arc::from(config.redacted_header_names()?),
        })
    }

    /// Log one exchange around `proceed`.
    ///
    /// `proceed` sends the request through the rest of the pipeline. It is
    /// called exactly once; its error is logged and returned unchanged.
    ///
    /// # Errors
    /// Returns whatever error `proceed` returned.
    pub async fn intercept<F, Fut, E>(
        &self,
        request: Request<Full<Bytes>>,
        proceed: F,
    ) -> Result<Response<ResponseBody>, E>
    where
        F: FnOnce(Request<Full<Bytes>>) -> Fut,
        Fut: Future<Output = Result<Response<ResponseBody>, E>>,
        E: fmt::Display,
    {
        let verbosity = Verbosity::of(self.sink.as_ref());
        if verbosity == Verbosity::Off {
            return proceed(request).await;
        }

        let method = request.method().clone();
        let url = request.uri().clone();
        let request = self.log_request(request, verbosity).await;

        let started = Instant::now();
        let response = match proceed(request).await {
            Ok(response) => response,
            Err(err) => {
                self.info(&format!("<-- HTTP FAILED: {err}"));
                return Err(err);
            }
        };
        let took_ms = started.elapsed().as_millis();

        Ok(self
            .log_response(&method, &url, response, took_ms, verbosity)
            .await)
    }

    async fn log_request(
        &self,
        request: Request<Full<Bytes>>,
        verbosity: Verbosity,
    ) -> Request<Full<Bytes>> {
        let protocol = request
            .extensions()
            .get::<NegotiatedProtocol>()
            .map_or(Version::HTTP_11, |p| p.0);
        self.info(&format!(
            "--> {} {} {}",
            request.method(),
            request.uri(),
            protocol_label(protocol)
        ));

        if !verbosity.logs_headers() {
            return request;
        }

        let has_request_body = !request.body().is_end_stream();
        if has_request_body {
            // Body headers may not be set yet at this point in the stack;
            // describe the body itself.
            if let Some(content_type) = request.headers().get(CONTENT_TYPE) {
                self.info(&format!("Content-Type: {}", header_text(content_type)));
            }
            if let Some(len) = request.body().size_hint().exact() {
                self.info(&format!("Content-Length: {len}"));
            }
        }

        for (name, value) in request.headers() {
            if name != CONTENT_TYPE && name != CONTENT_LENGTH {
                self.log_header(name, value);
            }
        }

        let method = request.method().clone();
        if !verbosity.logs_body() || !has_request_body {
            self.info(&format!("--> END {method}"));
            return request;
        }
        if is_encoded(request.headers()) {
            self.info(&format!("--> END {method} (encoded body omitted)"));
            return request;
        }

        let (parts, body) = request.into_parts();
        let data = ReplayBody::buffer(body).await.bytes();
        let charset = Charset::of(parts.headers.get(CONTENT_TYPE));

        self.debug("");
        if is_plaintext(&data) {
            self.debug(&charset.decode(&data));
            self.debug(&format!("--> END {method} ({}-byte body)", data.len()));
        } else {
            self.debug(&format!(
                "--> END {method} (binary {}-byte body omitted)",
                data.len()
            ));
        }

        Request::from_parts(parts, Full::new(data))
    }

    async fn log_response(
        &self,
        method: &Method,
        url: &Uri,
        response: Response<ResponseBody>,
        took_ms: u128,
        verbosity: Verbosity,
    ) -> Response<ResponseBody> {
        let final_url = response
            .extensions()
            .get::<RequestUri>()
            .map_or(url, |uri| &uri.0);
        let length =
            content_length(response.headers()).or_else(|| response.body().size_hint().exact());
        let size = length.map_or_else(|| "unknown-length".to_owned(), |n| format!("{n}-byte"));
        let suffix = if verbosity.logs_headers() {
            String::new()
        } else {
            format!(", {size} body")
        };
        let status = response.status();
        self.info(&format!(
            "<-- {} {} {final_url} (took {took_ms} ms {suffix})",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        ));

        if !verbosity.logs_headers() {
            return response;
        }

        for (name, value) in response.headers() {
            self.log_header(name, value);
        }

        if !verbosity.logs_body() || !has_body(method, status, response.headers()) {
            self.info("<-- END HTTP");
            return response;
        }
        if is_encoded(response.headers()) {
            self.info("<-- END HTTP (encoded body omitted)");
            return response;
        }

        let (parts, body) = response.into_parts();
        let replay = ReplayBody::buffer(body).await;
        if let Some(err) = replay.error() {
            self.info(&format!("<-- END HTTP (body read failed: {err})"));
            return Response::from_parts(parts, replay.into_response_body());
        }

        let data = replay.bytes();
        if !is_plaintext(&data) {
            self.debug("");
            self.debug(&format!(
                "<-- END HTTP (binary {}-byte body omitted)",
                data.len()
            ));
            return Response::from_parts(parts, replay.into_response_body());
        }

        if length != Some(0) {
            let charset = Charset::of(parts.headers.get(CONTENT_TYPE));
            self.debug("");
            self.debug(&charset.decode(&data));
        }
        self.debug(&format!("<-- END HTTP ({}-byte body)", data.len()));

        Response::from_parts(parts, replay.into_response_body())
    }

    fn log_header(&self, name: &HeaderName, value: &HeaderValue) {
        if self.redacted.contains(name) {
            self.info(&format!("{name}: {REDACTED_VALUE}"));
        } else {
            self.info(&format!("{name}: {}", header_text(value)));
        }
    }

    fn info(&self, line: &str) {
        self.sink.log(WireLevel::Info, line);
    }

    fn debug(&self, line: &str) {
        self.sink.log(WireLevel::Debug, line);
    }
}

impl Default for HttpLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn protocol_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn header_text(value: &HeaderValue) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(value.as_bytes())
}

/// Tower layer that logs every exchange passing through it
#[derive(Clone, Default)]
pub struct HttpLoggingLayer {
    logger: HttpLogger,
}

impl HttpLoggingLayer {
    /// Layer logging to the default [`TracingSink`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer using a preconfigured [`HttpLogger`]
    #[must_use]
    pub fn with_logger(logger: HttpLogger) -> Self {
        Self { logger }
    }

    /// Layer built from configuration
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &HttpLoggingConfig) -> Result<Self, HttpLoggingError> {
        Ok(Self::with_logger(HttpLogger::from_config(config)?))
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLoggingService {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Service that logs requests and responses around its inner service
#[derive(Clone)]
pub struct HttpLoggingService<S> {
    inner: S,
    logger: HttpLogger,
}

impl<S> Service<Request<Full<Bytes>>> for HttpLoggingService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: fmt::Display + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // Swap so we call the instance that was poll_ready'd, leaving a fresh clone
        // for the next poll_ready cycle.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();

        Box::pin(async move { logger.intercept(req, move |req| inner.call(req)).await })
    }
}
