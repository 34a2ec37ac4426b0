use crate::telemetry::tracing;
use crate::{BoxHandler, Failure, Handler, HandlerResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// An ordered list of [`Handler`]s, built once and invoked many times.
///
/// Invoking a chain starts at its first handler. Each handler receives
/// a [`Next`] continuation which, when run, invokes the handler that follows it.
/// A handler can only ever reach the handlers after its own position.
///
/// Misusing a continuation (running it twice, or running the one handed to
/// the last handler) fails the whole invocation, even when the offending
/// handler discards that failure and answers with a response of its own.
///
/// [`Handler`]: crate::Handler
pub struct Chain<Req, Res> {
    handlers: Arc<[BoxHandler<Req, Res>]>,
}

impl<Req, Res> Chain<Req, Res> {
    /// Create a new [`Chain`] from the given handlers, in invocation order.
    pub fn new(handlers: impl IntoIterator<Item = BoxHandler<Req, Res>>) -> Self {
        Self {
            handlers: handlers.into_iter().collect(),
        }
    }

    /// Create a new [`Chain`] which runs all `prefix` handlers
    /// before the given `handlers`.
    #[must_use]
    pub fn with_prefix(prefix: &[BoxHandler<Req, Res>], handlers: &[BoxHandler<Req, Res>]) -> Self {
        Self::new(prefix.iter().chain(handlers).cloned())
    }

    /// Number of handlers in this chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if this chain has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterate over the handlers of this chain, in invocation order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxHandler<Req, Res>> {
        self.handlers.iter()
    }
}

impl<Req: 'static, Res: Send + 'static> Chain<Req, Res> {
    /// Invoke the chain with the given request.
    ///
    /// Invoking an empty chain results in [`Failure::NoNextHandler`].
    pub fn call(&self, req: Req) -> HandlerResult<Res> {
        let violation = Arc::new(OnceLock::new());
        let result = Next::new(self.handlers.clone(), 0, violation.clone()).run(req);
        if result.is_immediate() {
            return match violation.get() {
                Some(violation) => HandlerResult::Failed(violation.failure()),
                None => result,
            };
        }
        // continuations can still be misused while the result is pending
        HandlerResult::deferred(async move {
            let outcome = result.resolve().await;
            match violation.get() {
                Some(violation) => Err(violation.failure()),
                None => outcome,
            }
        })
    }
}

impl<Req, Res> Clone for Chain<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for Chain<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.iter()).finish()
    }
}

/// Continuation handed to a [`Handler`], invoking the rest of the [`Chain`].
///
/// A continuation can be run at most once. Running it again
/// results in [`Failure::NextCalledTwice`].
///
/// [`Handler`]: crate::Handler
pub struct Next<Req, Res> {
    handlers: Arc<[BoxHandler<Req, Res>]>,
    position: usize,
    called: AtomicBool,
    violation: Arc<OnceLock<Violation>>,
}

/// First continuation misuse recorded during one chain invocation.
#[derive(Debug, Clone, Copy)]
enum Violation {
    NoNextHandler,
    NextCalledTwice,
}

impl Violation {
    fn failure(self) -> Failure {
        match self {
            Self::NoNextHandler => Failure::NoNextHandler,
            Self::NextCalledTwice => Failure::NextCalledTwice,
        }
    }
}

impl<Req, Res> Next<Req, Res> {
    fn new(
        handlers: Arc<[BoxHandler<Req, Res>]>,
        position: usize,
        violation: Arc<OnceLock<Violation>>,
    ) -> Self {
        Self {
            handlers,
            position,
            called: AtomicBool::new(false),
            violation,
        }
    }

    /// Number of handlers which can still be reached through this continuation.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.handlers.len().saturating_sub(self.position)
    }
}

impl<Req: 'static, Res: 'static> Next<Req, Res> {
    /// Invoke the next handler in the chain with the given request.
    ///
    /// Fails with [`Failure::NoNextHandler`] when there is no next handler,
    /// and with [`Failure::NextCalledTwice`] when this continuation already ran.
    /// Either failure is also recorded for the chain invocation as a whole.
    ///
    /// The result has to be returned or resolved, dropping it is flagged:
    ///
    /// ```compile_fail
    /// #![deny(unused_must_use)]
    /// use trellis_core::{HandlerResult, Next, handler_fn};
    ///
    /// let forgetful = handler_fn(|req: u8, next: Next<u8, u8>| {
    ///     next.run(req);
    ///     HandlerResult::Immediate(req)
    /// });
    /// ```
    #[must_use = "dropping the result of the rest of the chain leaves the request unanswered"]
    pub fn run(&self, req: Req) -> HandlerResult<Res> {
        if self.called.swap(true, Ordering::AcqRel) {
            return self.violate(Violation::NextCalledTwice);
        }
        let Some(handler) = self.handlers.get(self.position) else {
            return self.violate(Violation::NoNextHandler);
        };
        tracing::trace!(
            position = self.position,
            handler = handler.name(),
            "invoke handler"
        );
        handler.handle(
            req,
            Self::new(
                self.handlers.clone(),
                self.position + 1,
                self.violation.clone(),
            ),
        )
    }

    fn violate(&self, violation: Violation) -> HandlerResult<Res> {
        tracing::trace!(position = self.position, ?violation, "continuation misused");
        // the first misuse wins
        self.violation.get_or_init(|| violation);
        HandlerResult::Failed(violation.failure())
    }
}

impl<Req, Res> fmt::Debug for Next<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .field("called", &self.called.load(Ordering::Acquire))
            .finish()
    }
}
