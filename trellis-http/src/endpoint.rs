use crate::response::IntoResponse;
use crate::{Request, Response};
use trellis_core::{Failure, Handler, HandlerResult, terminal_fn};
use trellis_error::BoxError;

/// Create a terminal [`Handler`] from a synchronous function
/// returning anything that implements [`IntoResponse`].
///
/// ```
/// use trellis_http::{Request, RequestExt, endpoint};
///
/// let hello = endpoint(|req: Request| {
///     format!("Hello {}!", req.path_param("name").unwrap_or("stranger"))
/// });
/// # let _ = hello;
/// ```
pub fn endpoint<F, R>(f: F) -> impl Handler<Request, Response>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    terminal_fn(move |req: Request| HandlerResult::Immediate(f(req).into_response()))
}

/// Create a terminal [`Handler`] from an async function.
///
/// The handler answers with a [`HandlerResult::Deferred`]. An error
/// returned by the function surfaces as an application [`Failure`].
pub fn async_endpoint<F, Fut, R, E>(f: F) -> impl Handler<Request, Response>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse,
    E: Into<BoxError>,
{
    terminal_fn(move |req: Request| {
        let future = f(req);
        HandlerResult::deferred(async move {
            future
                .await
                .map(IntoResponse::into_response)
                .map_err(Failure::application)
        })
    })
}
