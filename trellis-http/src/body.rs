//! Asynchronous HTTP request or response body.

use bytes::Bytes;
use futures::TryStream;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt as _;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use sync_wrapper::SyncWrapper;
use trellis_error::{BoxError, ErrorContext, OpaqueError};

pub use http_body::Body as StreamingBody;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// The body type used in trellis requests and responses.
///
/// Either fully buffered or streaming. Both flow through the
/// handler chain unchanged, it is up to the handlers to collect it.
#[must_use]
#[derive(Debug)]
pub struct Body(BoxBody);

impl Body {
    /// Create a new [`Body`] that wraps another [`StreamingBody`].
    pub fn new<B>(body: B) -> Self
    where
        B: StreamingBody<Data = Bytes, Error: Into<BoxError>> + Send + Sync + 'static,
    {
        Self(body.map_err(Into::into).boxed())
    }

    /// Create an empty body.
    pub fn empty() -> Self {
        Self::new(http_body_util::Empty::new())
    }

    /// Create a new [`Body`] from a [`Stream`] of chunks.
    ///
    /// [`Stream`]: futures::Stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: TryStream<Ok: Into<Bytes>, Error: Into<BoxError>> + Send + 'static,
    {
        Self::new(StreamBody {
            stream: SyncWrapper::new(stream),
        })
    }

    /// Collect the entire body into memory.
    pub async fn collect_bytes(self) -> Result<Bytes, OpaqueError> {
        let collected = self
            .0
            .collect()
            .await
            .map_err(OpaqueError::from_boxed)
            .context("collect body")?;
        Ok(collected.to_bytes())
    }

    /// Collect the entire body into memory as an utf-8 string.
    pub async fn collect_string(self) -> Result<String, OpaqueError> {
        let bytes = self.collect_bytes().await?;
        String::from_utf8(bytes.to_vec()).context("decode body as utf-8")
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for Body {
            fn from(buf: $ty) -> Self {
                Self::new(http_body_util::Full::from(buf))
            }
        }
    };
}

body_from_impl!(&'static [u8]);
body_from_impl!(Vec<u8>);
body_from_impl!(&'static str);
body_from_impl!(String);
body_from_impl!(Bytes);

impl StreamingBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}

pin_project! {
    struct StreamBody<S> {
        #[pin]
        stream: SyncWrapper<S>,
    }
}

impl<S> StreamingBody for StreamBody<S>
where
    S: TryStream<Ok: Into<Bytes>, Error: Into<BoxError>>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let stream = self.project().stream.get_pin_mut();
        match futures::ready!(stream.try_poll_next(cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(Frame::data(chunk.into())))),
            Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn collect_buffered() {
        assert_eq!(Body::from("hello").collect_string().await.unwrap(), "hello");
        assert_eq!(Body::from(vec![1u8, 2]).collect_bytes().await.unwrap(), [1u8, 2][..]);
        assert!(Body::empty().collect_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_stream() {
        let chunks: Vec<Result<_, io::Error>> = vec![Ok("hel"), Ok("lo")];
        let body = Body::from_stream(futures::stream::iter(chunks));
        assert_eq!(body.collect_string().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn stream_error_has_context() {
        let chunks: Vec<Result<&'static str, io::Error>> =
            vec![Ok("x"), Err(io::Error::other("reset by peer"))];
        let body = Body::from_stream(futures::stream::iter(chunks));
        let err = body.collect_bytes().await.unwrap_err();
        assert_eq!(err.to_string(), "collect body: reset by peer");
    }

    #[tokio::test]
    async fn invalid_utf8() {
        let err = Body::from(vec![0xff, 0xfe]).collect_string().await.unwrap_err();
        assert!(err.to_string().starts_with("decode body as utf-8"));
    }
}
