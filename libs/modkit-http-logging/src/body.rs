use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Boxed error carried by [`ResponseBody`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for the boxed response body the middleware operates on.
///
/// Matches the body type produced by the `ModKit` HTTP client stack, so the
/// layer can sit anywhere inside it.
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Body that replays bytes already read from another body.
///
/// Created by [`ReplayBody::buffer`], which drains the source body into
/// memory. The buffered bytes can be inspected with [`ReplayBody::bytes`] and
/// the value then handed on as the body of the original message: it yields
/// the same data, trailers, and read error (if the source failed part-way)
/// as the source would have.
#[derive(Debug)]
pub struct ReplayBody {
    data: Bytes,
    trailers: Option<HeaderMap>,
    error: Option<BoxError>,
    data_sent: bool,
}

impl ReplayBody {
    /// Read `body` to the end (or to its first error) and keep everything.
    pub async fn buffer<B>(mut body: B) -> Self
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Into<BoxError>,
    {
        let mut data = BytesMut::new();
        let mut trailers: Option<HeaderMap> = None;
        let mut error = None;

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => match frame.into_data() {
                    Ok(chunk) => data.extend_from_slice(&chunk),
                    Err(frame) => {
                        if let Ok(t) = frame.into_trailers() {
                            trailers.get_or_insert_with(HeaderMap::new).extend(t);
                        }
                    }
                },
                Err(e) => {
                    error = Some(e.into());
                    break;
                }
            }
        }

        Self {
            data: data.freeze(),
            trailers,
            error,
            data_sent: false,
        }
    }

    /// The buffered bytes (a cheap reference-counted clone)
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// The error that stopped buffering, if the source body failed
    #[must_use]
    pub fn error(&self) -> Option<&BoxError> {
        self.error.as_ref()
    }

    /// Box into the middleware's [`ResponseBody`]
    #[must_use]
    pub fn into_response_body(self) -> ResponseBody {
        self.boxed()
    }
}

impl Body for ReplayBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if !this.data_sent {
            this.data_sent = true;
            if !this.data.is_empty() {
                return Poll::Ready(Some(Ok(Frame::data(this.data.clone()))));
            }
        }
        if let Some(err) = this.error.take() {
            return Poll::Ready(Some(Err(err)));
        }
        Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))))
    }

    fn is_end_stream(&self) -> bool {
        (self.data_sent || self.data.is_empty()) && self.error.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        let remaining = if self.data_sent { 0 } else { self.data.len() };
        let remaining = u64::try_from(remaining).unwrap_or(u64::MAX);
        if self.error.is_some() {
            let mut hint = SizeHint::new();
            hint.set_lower(remaining);
            hint
        } else {
            SizeHint::with_exact(remaining)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{Full, StreamBody};

    #[tokio::test]
    async fn test_replay_yields_identical_bytes() {
        let replay = ReplayBody::buffer(Full::new(Bytes::from_static(b"hello"))).await;
        assert_eq!(replay.bytes(), Bytes::from_static(b"hello"));
        assert!(replay.error().is_none());
        assert_eq!(replay.size_hint().exact(), Some(5));

        // Inspecting the buffer does not consume it
        assert_eq!(replay.bytes().len(), 5);
        let collected = replay.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_replay_joins_chunks_and_keeps_trailers() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", "abc".parse().unwrap());
        let frames: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"he"))),
            Ok(Frame::data(Bytes::from_static(b"llo"))),
            Ok(Frame::trailers(trailers)),
        ];
        let source = StreamBody::new(stream::iter(frames));

        let replay = ReplayBody::buffer(source).await;
        assert_eq!(replay.bytes(), Bytes::from_static(b"hello"));

        let collected = replay.collect().await.unwrap();
        assert_eq!(
            collected.trailers().and_then(|t| t.get("x-checksum")),
            Some(&http::HeaderValue::from_static("abc"))
        );
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_replay_reports_read_error_after_data() {
        let frames: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"par"))),
            Err("connection reset".into()),
        ];
        let source = StreamBody::new(stream::iter(frames));

        let replay = ReplayBody::buffer(source).await;
        assert_eq!(replay.bytes(), Bytes::from_static(b"par"));
        assert_eq!(replay.error().unwrap().to_string(), "connection reset");
        assert_eq!(replay.size_hint().exact(), None);

        let mut body = replay.into_response_body();
        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), Bytes::from_static(b"par"));
        let second = body.frame().await.unwrap();
        assert_eq!(second.unwrap_err().to_string(), "connection reset");
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_replay_is_end_of_stream() {
        let replay = ReplayBody::buffer(Full::new(Bytes::new())).await;
        assert!(replay.is_end_stream());
        assert!(replay.bytes().is_empty());
    }
}
