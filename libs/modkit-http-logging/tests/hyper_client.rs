#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Wire logging in front of a real hyper client talking to a mock server.

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use httpmock::prelude::*;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use modkit_http_logging::{
    HttpLogger, HttpLoggingConfig, HttpLoggingLayer, LogSink, ResponseBody, Verbosity, WireLevel,
};
use std::sync::{Arc, Mutex};
use tower::{Service, ServiceBuilder, ServiceExt};

struct RecordingSink {
    verbosity: Verbosity,
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn new(verbosity: Verbosity) -> Arc<Self> {
        Arc::new(Self {
            verbosity,
            lines: Mutex::new(Vec::new()),
        })
    }

    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for RecordingSink {
    fn enabled(&self, level: WireLevel) -> bool {
        match level {
            WireLevel::Info => self.verbosity.logs_headers(),
            WireLevel::Debug => self.verbosity.logs_body(),
        }
    }

    fn log(&self, _level: WireLevel, line: &str) {
        self.lines.lock().unwrap().push(line.to_owned());
    }
}

fn box_response(response: Response<Incoming>) -> Response<ResponseBody> {
    response.map(|body| body.map_err(Into::into).boxed())
}

fn logging_client(
    logger: HttpLogger,
) -> impl Service<
    Request<Full<Bytes>>,
    Response = Response<ResponseBody>,
    Error = hyper_util::client::legacy::Error,
> + Clone {
    let client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();
    ServiceBuilder::new()
        .layer(HttpLoggingLayer::with_logger(logger))
        .map_response(box_response)
        .service(client)
}

#[tokio::test]
async fn test_logs_exchange_and_keeps_body_readable() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(POST).path("/greeting").body("Hi?");
        then.status(200)
            .header("content-type", "text/plain; charset=utf-8")
            .body("Hello!");
    });

    let sink = RecordingSink::new(Verbosity::Debug);
    let mut client = logging_client(HttpLogger::with_sink(sink.clone()));

    let url = server.url("/greeting");
    let request = Request::builder()
        .method(Method::POST)
        .uri(&url)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from_static(b"Hi?")))
        .unwrap();
    let response = client.ready().await.unwrap().call(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"Hello!"));

    let lines = sink.lines();
    assert_eq!(&lines[..6], [
        format!("--> POST {url} HTTP/1.1"),
        "Content-Type: text/plain".to_owned(),
        "Content-Length: 3".to_owned(),
        String::new(),
        "Hi?".to_owned(),
        "--> END POST (3-byte body)".to_owned(),
    ]);
    assert!(
        lines
            .iter()
            .any(|l| l.starts_with(&format!("<-- 200 OK {url} (took ")))
    );
    assert!(lines.contains(&"content-type: text/plain; charset=utf-8".to_owned()));
    assert!(lines.contains(&"Hello!".to_owned()));
    assert_eq!(lines.last().unwrap(), "<-- END HTTP (6-byte body)");
}

#[tokio::test]
async fn test_redacts_and_summarizes_at_info() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/account");
        then.status(404)
            .header("set-cookie", "session=abc")
            .body("missing");
    });

    let sink = RecordingSink::new(Verbosity::Info);
    let config = HttpLoggingConfig::default()
        .redact_header("authorization")
        .redact_header("set-cookie");
    let logger =
        HttpLogger::try_with_sink(Some(sink.clone() as Arc<dyn LogSink>), &config).unwrap();
    let mut client = logging_client(logger);

    let request = Request::builder()
        .method(Method::GET)
        .uri(server.url("/account"))
        .header("authorization", "Bearer token")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = client.ready().await.unwrap().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let lines = sink.lines();
    assert!(lines.contains(&"authorization: [redacted]".to_owned()));
    assert!(lines.contains(&"set-cookie: [redacted]".to_owned()));
    assert!(!lines.iter().any(|l| l.contains("token") || l.contains("abc")));
    assert!(!lines.iter().any(|l| l.contains("missing")));
    assert_eq!(lines.last().unwrap(), "<-- END HTTP");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from_static(b"missing"));
}

#[tokio::test]
async fn test_connection_failure_logged_and_returned() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let sink = RecordingSink::new(Verbosity::Info);
    let mut client = logging_client(HttpLogger::with_sink(sink.clone()));

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("http://127.0.0.1:{port}/unreachable"))
        .body(Full::new(Bytes::new()))
        .unwrap();
    let err = client
        .ready()
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap_err();
    assert!(err.is_connect());

    let lines = sink.lines();
    let failed: Vec<_> = lines
        .iter()
        .filter(|l| l.starts_with("<-- HTTP FAILED: "))
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(*failed[0], format!("<-- HTTP FAILED: {err}"));
    assert!(!lines.iter().any(|l| l.contains("(took ")));
}
