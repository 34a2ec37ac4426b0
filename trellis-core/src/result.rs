use crate::{Failure, Suspendable};
use futures::FutureExt as _;
use futures::future::BoxFuture;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A value that settles later, exactly once, with either a `T` or a [`Failure`].
///
/// This is a boxed `Send` future, which makes it usable as the payload of
/// a [`HandlerResult`] regardless of the concrete future the handler produced.
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T, Failure>>,
}

impl<T> Deferred<T> {
    /// Create a [`Deferred`] value from the given future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, Failure>> + Send + 'static,
    {
        Self {
            inner: Box::pin(future),
        }
    }

    /// Create an already settled [`Deferred`] value.
    #[must_use]
    pub fn ready(result: Result<T, Failure>) -> Self
    where
        T: Send + 'static,
    {
        Self::new(std::future::ready(result))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("output", &format_args!("{}", std::any::type_name::<T>()))
            .finish()
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, Failure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

/// What a [`Handler`] returns.
///
/// A closed union over the ways a handler can produce its response.
/// Use [`HandlerResult::resolve`] to normalize any of them into
/// a single `Result<Res, Failure>`.
///
/// [`Handler`]: crate::Handler
#[must_use = "a handler result does nothing unless it is returned or resolved"]
pub enum HandlerResult<Res> {
    /// Synchronous completion.
    Immediate(Res),
    /// A response which is only available once the deferred value settles.
    Deferred(Deferred<Res>),
    /// A step sequence which ultimately produces the response.
    Suspendable(Box<dyn Suspendable<Res>>),
    /// Synchronous failure, raised before any response was produced.
    Failed(Failure),
}

impl<Res> HandlerResult<Res> {
    /// Create a [`HandlerResult::Deferred`] from the given future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Res, Failure>> + Send + 'static,
    {
        Self::Deferred(Deferred::new(future))
    }

    /// Create a [`HandlerResult::Suspendable`] from the given step sequence.
    pub fn suspendable(sequence: impl Suspendable<Res> + 'static) -> Self {
        Self::Suspendable(Box::new(sequence))
    }

    /// Returns `true` if the result is available without any suspension.
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate(_) | Self::Failed(_))
    }
}

impl<Res: Send + 'static> HandlerResult<Res> {
    /// Resolve this result into exactly one response or failure.
    ///
    /// [`Immediate`] and [`Failed`] results resolve on the first poll.
    /// [`Deferred`] results suspend the calling task until they settle.
    /// [`Suspendable`] sequences are driven step by step, suspending
    /// only on the deferred values they yield.
    ///
    /// [`Immediate`]: HandlerResult::Immediate
    /// [`Failed`]: HandlerResult::Failed
    /// [`Deferred`]: HandlerResult::Deferred
    /// [`Suspendable`]: HandlerResult::Suspendable
    pub async fn resolve(self) -> Result<Res, Failure> {
        match self {
            Self::Immediate(res) => Ok(res),
            Self::Failed(failure) => Err(failure),
            Self::Deferred(deferred) => deferred.await,
            Self::Suspendable(sequence) => crate::suspend::drive(sequence).await,
        }
    }

    /// Map the eventual response, keeping the result immediate when it already is.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(Res) -> Res + Send + 'static,
    {
        match self {
            Self::Immediate(res) => Self::Immediate(f(res)),
            Self::Failed(failure) => Self::Failed(failure),
            pending => Self::deferred(async move { pending.resolve().await.map(f) }),
        }
    }
}

impl<Res> From<Result<Res, Failure>> for HandlerResult<Res> {
    fn from(result: Result<Res, Failure>) -> Self {
        match result {
            Ok(res) => Self::Immediate(res),
            Err(failure) => Self::Failed(failure),
        }
    }
}

impl<Res> From<Deferred<Res>> for HandlerResult<Res> {
    fn from(deferred: Deferred<Res>) -> Self {
        Self::Deferred(deferred)
    }
}

impl<Res> fmt::Debug for HandlerResult<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("HandlerResult::Immediate"),
            Self::Deferred(_) => f.write_str("HandlerResult::Deferred"),
            Self::Suspendable(_) => f.write_str("HandlerResult::Suspendable"),
            Self::Failed(failure) => f.debug_tuple("HandlerResult::Failed").field(failure).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resume, Step, Yielded};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    fn all_variants(body: &'static str) -> Vec<HandlerResult<String>> {
        vec![
            HandlerResult::Immediate(body.to_owned()),
            HandlerResult::deferred(async move {
                tokio::task::yield_now().await;
                Ok(body.to_owned())
            }),
            HandlerResult::suspendable(move |input: Resume| {
                if input.is_start() {
                    Step::Yielded(Yielded::deferred(async move { Ok(body.to_owned()) }))
                } else {
                    match input.take::<String>() {
                        Ok(body) => Step::Completed(body),
                        Err(failure) => Step::Failed(failure),
                    }
                }
            }),
        ]
    }

    #[tokio::test]
    async fn normalization_is_variant_agnostic() {
        for result in all_variants("hello") {
            assert_eq!(result.resolve().await.unwrap(), "hello");
        }
    }

    #[test]
    fn immediate_resolves_without_suspending() {
        let mut fut = task::spawn(HandlerResult::Immediate(1u8).resolve());
        assert_eq!(assert_ready!(fut.poll()).unwrap(), 1);

        let mut fut = task::spawn(HandlerResult::<u8>::Failed(Failure::NoNextHandler).resolve());
        assert!(matches!(
            assert_ready!(fut.poll()),
            Err(Failure::NoNextHandler)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_suspends_until_settled() {
        let (tx, rx) = tokio::sync::oneshot::channel::<u8>();
        let result = HandlerResult::deferred(async move {
            rx.await.map_err(Failure::application)
        });

        let mut fut = task::spawn(result.resolve());
        assert_pending!(fut.poll());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_pending!(fut.poll());

        tx.send(7).unwrap();
        assert!(fut.is_woken());
        assert_eq!(assert_ready!(fut.poll()).unwrap(), 7);
    }

    #[tokio::test]
    async fn deferred_failure_carries_cause() {
        let result: HandlerResult<u8> =
            HandlerResult::deferred(async { Err(Failure::application("database offline")) });
        let failure = result.resolve().await.unwrap_err();
        assert!(matches!(failure, Failure::Application(_)));
        assert_eq!(failure.to_string(), "database offline");
    }

    #[tokio::test]
    async fn map_applies_to_every_variant() {
        for result in all_variants("hello") {
            let mapped = result.map(|body| body.to_uppercase());
            assert_eq!(mapped.resolve().await.unwrap(), "HELLO");
        }
    }

    #[test]
    fn map_keeps_immediate_immediate() {
        let mapped = HandlerResult::Immediate(2u32).map(|n| n * 21);
        assert!(mapped.is_immediate());
        assert!(matches!(mapped, HandlerResult::Immediate(42)));
    }

    #[test]
    fn from_result() {
        assert!(matches!(
            HandlerResult::from(Ok::<_, Failure>(1u8)),
            HandlerResult::Immediate(1)
        ));
        assert!(matches!(
            HandlerResult::<u8>::from(Err(Failure::NextCalledTwice)),
            HandlerResult::Failed(Failure::NextCalledTwice)
        ));
    }
}
