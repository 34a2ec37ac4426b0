//! The [`Dispatcher`], turning requests into responses.

use crate::access_log::AccessLog;
use crate::error_handler::{ErrorHandler, Reporter};
use crate::response::Redirect;
use crate::router::{RouteError, RouteMatch, Router, STANDARD_METHODS};
use crate::{
    DispatcherConfig, HttpChain, HttpHandler, Request, RequestExt, Response, endpoint,
};
use http::{HeaderValue, Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use trellis_core::telemetry::tracing;
use trellis_core::{Failure, Handler, HandlerResult, terminal_fn};

/// Dispatches requests through their handler chain.
///
/// All chains are built once by [`DispatcherBuilder::build`]: one per
/// registered route, one for requests no route matches and one for requests
/// using a method their path has no route for. The global middleware is
/// prepended to each of them, so it sees every request.
///
/// The dispatcher holds no per-request state and is cheap to clone.
///
/// ```
/// use trellis_http::{Body, Dispatcher, Request, StatusCode, endpoint};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dispatcher = Dispatcher::builder()
///     .with_get("/", endpoint(|_req| "Hello, World!"))
///     .build()
///     .unwrap();
///
/// let res = dispatcher.dispatch(Request::new(Body::empty())).await;
/// assert_eq!(res.status(), StatusCode::OK);
///
/// let req = Request::builder().uri("/missing").body(Body::empty()).unwrap();
/// assert_eq!(dispatcher.dispatch(req).await.status(), StatusCode::NOT_FOUND);
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    router: Router,
    not_found: HttpChain,
    method_not_allowed: HttpChain,
    error_handler: ErrorHandler,
    config: DispatcherConfig,
}

/// Methods registered for the requested path, read by the 405 chain.
#[derive(Debug, Clone)]
struct AllowedMethods(Vec<Method>);

impl Dispatcher {
    /// Create a new [`DispatcherBuilder`].
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// The route table of this dispatcher.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// Dispatch the request and produce its response.
    ///
    /// This never fails: routing failures are answered with a 404 or 405
    /// response, handler failures (panics included) are answered by the
    /// [`ErrorHandler`].
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let chain = match self.inner.router.at(req.method(), req.uri().path()) {
            RouteMatch::Matched { chain, params } => {
                if !params.is_empty() {
                    let attributes = req.attributes().with_all(params);
                    req = req.with_attributes(attributes);
                }
                chain
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                tracing::debug!(
                    http.request.method = %req.method(),
                    url.path = req.uri().path(),
                    "no route for method, allowed: {allowed:?}"
                );
                req.extensions_mut().insert(AllowedMethods(allowed));
                &self.inner.method_not_allowed
            }
            RouteMatch::NotFound => {
                tracing::debug!(url.path = req.uri().path(), "no route for path");
                &self.inner.not_found
            }
        };

        match trellis_core::execute(chain, req).await {
            Ok(res) => res,
            Err(failure) => self.inner.error_handler.failure(&failure),
        }
    }

    /// Dispatch the request, unless the `cancel` token fires first.
    ///
    /// Returns `None` once cancelled, in which case the pending chain is
    /// dropped and no response should be written.
    pub async fn dispatch_with_cancel(
        &self,
        req: Request,
        cancel: CancellationToken,
    ) -> Option<Response> {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!("dispatch cancelled before the response was ready");
                None
            }
            res = self.dispatch(req) => Some(res),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.inner.router)
            .field("error_handler", &self.inner.error_handler)
            .finish()
    }
}

struct PendingRoute {
    methods: Vec<Method>,
    pattern: String,
    target: RouteTarget,
}

enum RouteTarget {
    Handlers(Vec<HttpHandler>),
    Redirect { location: String, status: StatusCode },
}

/// Builder for a [`Dispatcher`], see [`Dispatcher::builder`].
pub struct DispatcherBuilder {
    middleware: Vec<HttpHandler>,
    routes: Vec<PendingRoute>,
    config: DispatcherConfig,
    reporter: Option<Reporter>,
    access_log: bool,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! method_routes {
    ($($method:ident => $with:ident, $set:ident;)+) => {
        $(
            #[doc = concat!("Add a ", stringify!($method), " route, served by the given handler.")]
            #[must_use]
            pub fn $with<H>(mut self, pattern: &str, handler: H) -> Self
            where
                H: Handler<Request, Response>,
            {
                self.$set(pattern, handler);
                self
            }

            #[doc = concat!("Add a ", stringify!($method), " route, served by the given handler.")]
            pub fn $set<H>(&mut self, pattern: &str, handler: H) -> &mut Self
            where
                H: Handler<Request, Response>,
            {
                self.set_route(&[Method::$method], pattern, [handler.boxed()])
            }
        )+
    };
}

impl DispatcherBuilder {
    /// Create a new [`DispatcherBuilder`] with the [`AccessLog`] enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
            routes: Vec::new(),
            config: DispatcherConfig::default(),
            reporter: None,
            access_log: true,
        }
    }

    /// Append a global handler, run before the handlers of every route.
    #[must_use]
    pub fn with_middleware<H>(mut self, handler: H) -> Self
    where
        H: Handler<Request, Response>,
    {
        self.set_middleware(handler);
        self
    }

    /// Append a global handler, run before the handlers of every route.
    pub fn set_middleware<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<Request, Response>,
    {
        self.middleware.push(handler.boxed());
        self
    }

    method_routes! {
        GET => with_get, set_get;
        POST => with_post, set_post;
        PUT => with_put, set_put;
        PATCH => with_patch, set_patch;
        DELETE => with_delete, set_delete;
        HEAD => with_head, set_head;
        OPTIONS => with_options, set_options;
    }

    /// Add a route for all standard methods, served by the given handler.
    #[must_use]
    pub fn with_any<H>(mut self, pattern: &str, handler: H) -> Self
    where
        H: Handler<Request, Response>,
    {
        self.set_any(pattern, handler);
        self
    }

    /// Add a route for all standard methods, served by the given handler.
    pub fn set_any<H>(&mut self, pattern: &str, handler: H) -> &mut Self
    where
        H: Handler<Request, Response>,
    {
        self.set_route(&STANDARD_METHODS, pattern, [handler.boxed()])
    }

    /// Add a route for the given methods, served by the given handler.
    #[must_use]
    pub fn with_map<H>(mut self, methods: &[Method], pattern: &str, handler: H) -> Self
    where
        H: Handler<Request, Response>,
    {
        self.set_map(methods, pattern, handler);
        self
    }

    /// Add a route for the given methods, served by the given handler.
    pub fn set_map<H>(&mut self, methods: &[Method], pattern: &str, handler: H) -> &mut Self
    where
        H: Handler<Request, Response>,
    {
        self.set_route(methods, pattern, [handler.boxed()])
    }

    /// Add a route for the given methods, served by the given handlers in order.
    ///
    /// All but the last handler are route-specific middleware,
    /// the last one is expected to produce the response.
    #[must_use]
    pub fn with_route(
        mut self,
        methods: &[Method],
        pattern: &str,
        handlers: impl IntoIterator<Item = HttpHandler>,
    ) -> Self {
        self.set_route(methods, pattern, handlers);
        self
    }

    /// Add a route for the given methods, served by the given handlers in order.
    ///
    /// All but the last handler are route-specific middleware,
    /// the last one is expected to produce the response.
    pub fn set_route(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handlers: impl IntoIterator<Item = HttpHandler>,
    ) -> &mut Self {
        self.routes.push(PendingRoute {
            methods: methods.to_vec(),
            pattern: pattern.to_owned(),
            target: RouteTarget::Handlers(handlers.into_iter().collect()),
        });
        self
    }

    /// Redirect all standard methods on `pattern` to `location`.
    ///
    /// An invalid location is reported by [`DispatcherBuilder::build`].
    #[must_use]
    pub fn with_redirect(mut self, pattern: &str, location: &str, status: StatusCode) -> Self {
        self.set_redirect(pattern, location, status);
        self
    }

    /// Redirect all standard methods on `pattern` to `location`.
    ///
    /// An invalid location is reported by [`DispatcherBuilder::build`].
    pub fn set_redirect(&mut self, pattern: &str, location: &str, status: StatusCode) -> &mut Self {
        self.routes.push(PendingRoute {
            methods: STANDARD_METHODS.to_vec(),
            pattern: pattern.to_owned(),
            target: RouteTarget::Redirect {
                location: location.to_owned(),
                status,
            },
        });
        self
    }

    /// Use the given [`DispatcherConfig`].
    #[must_use]
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the given [`DispatcherConfig`].
    pub fn set_config(&mut self, config: DispatcherConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Notify `reporter` of every contract violation.
    #[must_use]
    pub fn with_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.set_reporter(reporter);
        self
    }

    /// Notify `reporter` of every contract violation.
    pub fn set_reporter<F>(&mut self, reporter: F) -> &mut Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Do not prepend the [`AccessLog`] to the global handlers.
    #[must_use]
    pub fn without_access_log(mut self) -> Self {
        self.access_log = false;
        self
    }

    /// Build all chains and the route table.
    pub fn build(self) -> Result<Dispatcher, RouteError> {
        let mut error_handler = ErrorHandler::new(&self.config);
        if let Some(reporter) = self.reporter {
            error_handler.set_reporter(reporter);
        }

        let mut global = Vec::with_capacity(self.middleware.len() + 1);
        if self.access_log {
            global.push(AccessLog::new().boxed());
        }
        global.extend(self.middleware);

        let mut router = Router::new();
        for route in self.routes {
            let handlers = match route.target {
                RouteTarget::Handlers(handlers) => handlers,
                RouteTarget::Redirect { location, status } => {
                    let redirect = HeaderValue::from_str(&location)
                        .map(|location| Redirect::to(location, status))
                        .map_err(|_invalid| RouteError::InvalidRedirect {
                            pattern: route.pattern.clone(),
                            location,
                        })?;
                    vec![endpoint(move |_req| redirect.clone()).boxed()]
                }
            };
            router.map(
                &route.methods,
                &route.pattern,
                HttpChain::with_prefix(&global, &handlers),
            )?;
        }

        let not_found = {
            let error_handler = error_handler.clone();
            terminal_fn(move |_req: Request| HandlerResult::Immediate(error_handler.not_found()))
        };
        let method_not_allowed = {
            let error_handler = error_handler.clone();
            terminal_fn(move |req: Request| {
                let allowed = req
                    .extensions()
                    .get::<AllowedMethods>()
                    .map(|allowed| allowed.0.as_slice())
                    .unwrap_or_default();
                HandlerResult::Immediate(error_handler.method_not_allowed(allowed))
            })
        };

        tracing::debug!(
            routes = router.routes().count(),
            global = global.len(),
            "dispatcher built"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                not_found: HttpChain::with_prefix(&global, &[not_found.boxed()]),
                method_not_allowed: HttpChain::with_prefix(&global, &[method_not_allowed.boxed()]),
                router,
                error_handler,
                config: self.config,
            }),
        })
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("middleware", &self.middleware)
            .field("routes", &self.routes.len())
            .field("config", &self.config)
            .field("access_log", &self.access_log)
            .finish()
    }
}
