//! [`Handler`] trait and its boxed and function-based implementations.

use crate::{HandlerResult, Next};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A unit of request processing which participates in a [`Chain`].
///
/// A handler either produces the response itself, or delegates to the
/// rest of the chain by running its [`Next`] continuation, possibly
/// transforming the request on the way in and the response on the way out.
/// Whatever it does, it answers with a [`HandlerResult`].
///
/// [`Chain`]: crate::Chain
pub trait Handler<Req, Res>: Send + Sync + 'static {
    /// Handle the request, optionally delegating to `next`.
    fn handle(&self, req: Req, next: Next<Req, Res>) -> HandlerResult<Res>;

    /// Box this handler to allow for dynamic dispatch.
    fn boxed(self) -> BoxHandler<Req, Res>
    where
        Self: Sized,
    {
        BoxHandler::new(self)
    }
}

impl<H, Req, Res> Handler<Req, Res> for Arc<H>
where
    H: Handler<Req, Res>,
{
    #[inline]
    fn handle(&self, req: Req, next: Next<Req, Res>) -> HandlerResult<Res> {
        self.as_ref().handle(req, next)
    }
}

impl<H, Req, Res> Handler<Req, Res> for Box<H>
where
    H: Handler<Req, Res>,
{
    #[inline]
    fn handle(&self, req: Req, next: Next<Req, Res>) -> HandlerResult<Res> {
        self.as_ref().handle(req, next)
    }
}

/// A shared, type-erased [`Handler`].
///
/// Cloning is cheap, which allows the same handler to be part of many chains.
pub struct BoxHandler<Req, Res> {
    inner: Arc<dyn Handler<Req, Res>>,
    name: &'static str,
}

impl<Req, Res> BoxHandler<Req, Res> {
    /// Create a new [`BoxHandler`] from the given handler.
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler<Req, Res>,
    {
        Self {
            inner: Arc::new(handler),
            name: std::any::type_name::<H>(),
        }
    }

    /// Type name of the handler which was boxed.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<Req, Res> Clone for BoxHandler<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name,
        }
    }
}

impl<Req, Res> fmt::Debug for BoxHandler<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxHandler").field("name", &self.name).finish()
    }
}

impl<Req: 'static, Res: 'static> Handler<Req, Res> for BoxHandler<Req, Res> {
    #[inline]
    fn handle(&self, req: Req, next: Next<Req, Res>) -> HandlerResult<Res> {
        self.inner.handle(req, next)
    }

    #[inline]
    fn boxed(self) -> Self {
        self
    }
}

/// Create a [`Handler`] from a closure which receives the request
/// together with the [`Next`] continuation.
///
/// ```
/// use trellis_core::{Chain, Handler, HandlerResult, handler_fn, terminal_fn};
///
/// let uppercase = handler_fn(|req: String, next| {
///     next.run(req).map(|res: String| res.to_uppercase())
/// });
/// let echo = terminal_fn(|req: String| HandlerResult::Immediate(req));
///
/// let chain = Chain::new([uppercase.boxed(), echo.boxed()]);
/// assert!(matches!(chain.call("hi".to_owned()), HandlerResult::Immediate(s) if s == "HI"));
/// ```
pub fn handler_fn<F, Req, Res>(f: F) -> HandlerFn<F, Req, Res>
where
    F: Fn(Req, Next<Req, Res>) -> HandlerResult<Res> + Send + Sync + 'static,
{
    HandlerFn {
        f,
        _marker: PhantomData,
    }
}

/// A [`Handler`] implemented by a closure, see [`handler_fn`].
pub struct HandlerFn<F, Req, Res> {
    f: F,
    _marker: PhantomData<fn(Req) -> Res>,
}

impl<F: Clone, Req, Res> Clone for HandlerFn<F, Req, Res> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, Req, Res> fmt::Debug for HandlerFn<F, Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn")
            .field("f", &format_args!("{}", std::any::type_name::<F>()))
            .finish()
    }
}

impl<F, Req, Res> Handler<Req, Res> for HandlerFn<F, Req, Res>
where
    F: Fn(Req, Next<Req, Res>) -> HandlerResult<Res> + Send + Sync + 'static,
    Req: 'static,
    Res: 'static,
{
    #[inline]
    fn handle(&self, req: Req, next: Next<Req, Res>) -> HandlerResult<Res> {
        (self.f)(req, next)
    }
}

/// Create a [`Handler`] from a closure which always produces
/// the response itself and never delegates.
pub fn terminal_fn<F, Req, Res>(f: F) -> TerminalFn<F, Req, Res>
where
    F: Fn(Req) -> HandlerResult<Res> + Send + Sync + 'static,
{
    TerminalFn {
        f,
        _marker: PhantomData,
    }
}

/// A [`Handler`] which ignores its continuation, see [`terminal_fn`].
pub struct TerminalFn<F, Req, Res> {
    f: F,
    _marker: PhantomData<fn(Req) -> Res>,
}

impl<F: Clone, Req, Res> Clone for TerminalFn<F, Req, Res> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, Req, Res> fmt::Debug for TerminalFn<F, Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalFn")
            .field("f", &format_args!("{}", std::any::type_name::<F>()))
            .finish()
    }
}

impl<F, Req, Res> Handler<Req, Res> for TerminalFn<F, Req, Res>
where
    F: Fn(Req) -> HandlerResult<Res> + Send + Sync + 'static,
    Req: 'static,
    Res: 'static,
{
    #[inline]
    fn handle(&self, req: Req, _next: Next<Req, Res>) -> HandlerResult<Res> {
        (self.f)(req)
    }
}
