//! Route table, wrapping the `matchit` path matcher.
//!
//! Patterns are matched on the request path only. Two kinds of dynamic
//! segments are supported:
//!
//! - `{name}` captures a single path segment;
//! - `{*name}` captures the remainder of the path, and can only appear at the end.
//!
//! ```
//! use trellis_http::router::{RouteMatch, Router};
//! use trellis_http::{HttpChain, Method};
//!
//! let mut router = Router::new();
//! router.route(Method::GET, "/users/{id}", HttpChain::new([])).unwrap();
//!
//! match router.at(&Method::GET, "/users/42") {
//!     RouteMatch::Matched { params, .. } => assert_eq!(params, [("id".to_owned(), "42".to_owned())]),
//!     other => panic!("unexpected match: {other:?}"),
//! }
//! assert!(matches!(router.at(&Method::POST, "/users/42"), RouteMatch::MethodNotAllowed { .. }));
//! assert!(matches!(router.at(&Method::GET, "/posts"), RouteMatch::NotFound));
//! ```

use crate::HttpChain;
use http::Method;
use indexmap::IndexMap;
use std::fmt;
use trellis_core::telemetry::tracing;

/// Methods registered by [`Router::any`].
pub const STANDARD_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Outcome of looking up a request in the [`Router`].
pub enum RouteMatch<'a> {
    /// Both path and method matched a registered route.
    Matched {
        /// The chain registered for the route.
        chain: &'a HttpChain,
        /// Path parameters captured by the pattern, in pattern order.
        params: Vec<(String, String)>,
    },
    /// The path matched a registered pattern, but not for this method.
    MethodNotAllowed {
        /// Methods served for the pattern, in registration order.
        allowed: Vec<Method>,
    },
    /// No registered pattern matches the path.
    NotFound,
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { chain, params } => f
                .debug_struct("Matched")
                .field("chain", &chain.len())
                .field("params", params)
                .finish(),
            Self::MethodNotAllowed { allowed } => f
                .debug_struct("MethodNotAllowed")
                .field("allowed", allowed)
                .finish(),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Error returned when a route cannot be registered.
#[derive(Debug)]
pub enum RouteError {
    /// The pattern is invalid, or conflicts with an already registered pattern.
    InvalidPattern {
        pattern: String,
        source: matchit::InsertError,
    },
    /// The method was already registered for this pattern.
    Duplicate { method: Method, pattern: String },
    /// The redirect location is not a valid header value.
    InvalidRedirect { pattern: String, location: String },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern, source } => {
                write!(f, "invalid route pattern {pattern:?}: {source}")
            }
            Self::Duplicate { method, pattern } => {
                write!(f, "route {method} {pattern:?} is already registered")
            }
            Self::InvalidRedirect { pattern, location } => {
                write!(f, "redirect from {pattern:?} to invalid location {location:?}")
            }
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            Self::Duplicate { .. } | Self::InvalidRedirect { .. } => None,
        }
    }
}

struct PathRoutes {
    pattern: String,
    methods: IndexMap<Method, HttpChain>,
}

impl PathRoutes {
    /// Registered methods in registration order, with `HEAD` right after
    /// `GET` when it is only served through the `GET` fallback.
    fn allowed(&self) -> Vec<Method> {
        let mut allowed = Vec::with_capacity(self.methods.len() + 1);
        for method in self.methods.keys() {
            allowed.push(method.clone());
            if method == Method::GET && !self.methods.contains_key(&Method::HEAD) {
                allowed.push(Method::HEAD);
            }
        }
        allowed
    }
}

/// Route table mapping `(method, path)` to a [`HttpChain`].
///
/// A `HEAD` request on a pattern that only has a `GET` route
/// is answered by the `GET` chain.
pub struct Router {
    matcher: matchit::Router<usize>,
    paths: Vec<PathRoutes>,
}

impl Router {
    /// Create an empty [`Router`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            paths: Vec::new(),
        }
    }

    /// Register a chain for the given method and pattern.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        chain: HttpChain,
    ) -> Result<&mut Self, RouteError> {
        let index = self.path_index(pattern)?;
        let routes = &mut self.paths[index];
        if routes.methods.contains_key(&method) {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.to_owned(),
            });
        }
        tracing::trace!(%method, pattern, "register route");
        routes.methods.insert(method, chain);
        Ok(self)
    }

    /// Register a chain for all [`STANDARD_METHODS`] of the given pattern.
    pub fn any(&mut self, pattern: &str, chain: HttpChain) -> Result<&mut Self, RouteError> {
        self.map(&STANDARD_METHODS, pattern, chain)
    }

    /// Register a chain for each of the given methods of the given pattern.
    pub fn map(
        &mut self,
        methods: &[Method],
        pattern: &str,
        chain: HttpChain,
    ) -> Result<&mut Self, RouteError> {
        for method in methods {
            self.route(method.clone(), pattern, chain.clone())?;
        }
        Ok(self)
    }

    /// Look up the route for the given method and path.
    #[must_use]
    pub fn at(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let Ok(matched) = self.matcher.at(path) else {
            return RouteMatch::NotFound;
        };
        let Some(routes) = self.paths.get(*matched.value) else {
            return RouteMatch::NotFound;
        };

        let chain = match routes.methods.get(method) {
            None if method == Method::HEAD => routes.methods.get(&Method::GET),
            chain => chain,
        };
        match chain {
            Some(chain) => RouteMatch::Matched {
                chain,
                params: matched
                    .params
                    .iter()
                    .map(|(name, value)| (name.to_owned(), value.to_owned()))
                    .collect(),
            },
            None => RouteMatch::MethodNotAllowed {
                allowed: routes.allowed(),
            },
        }
    }

    /// Iterate over all registered `(method, pattern)` pairs, in registration order per pattern.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.paths.iter().flat_map(|routes| {
            routes
                .methods
                .keys()
                .map(|method| (method, routes.pattern.as_str()))
        })
    }

    fn path_index(&mut self, pattern: &str) -> Result<usize, RouteError> {
        if let Some(index) = self.paths.iter().position(|routes| routes.pattern == pattern) {
            return Ok(index);
        }
        let index = self.paths.len();
        self.matcher
            .insert(pattern, index)
            .map_err(|source| RouteError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        self.paths.push(PathRoutes {
            pattern: pattern.to_owned(),
            methods: IndexMap::new(),
        });
        Ok(index)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.routes()
                    .map(|(method, pattern)| format!("{method} {pattern}")),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{Handler, HandlerResult, terminal_fn};

    fn chain(tag: &'static str) -> HttpChain {
        HttpChain::new([terminal_fn(move |_req: crate::Request| {
            HandlerResult::Immediate(crate::IntoResponse::into_response(tag))
        })
        .boxed()])
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .route(Method::GET, "/users/{id}", chain("get"))
            .unwrap()
            .route(Method::POST, "/users/{id}", chain("post"))
            .unwrap()
            .route(Method::GET, "/assets/{*path}", chain("assets"))
            .unwrap();
        router
    }

    #[test]
    fn matched_with_params() {
        let router = router();
        match router.at(&Method::GET, "/assets/css/site.css") {
            RouteMatch::Matched { params, .. } => {
                assert_eq!(params, [("path".to_owned(), "css/site.css".to_owned())]);
            }
            other => panic!("unexpected match: {other:?}"),
        }
    }

    #[test]
    fn method_not_allowed_in_registration_order() {
        let router = router();
        match router.at(&Method::DELETE, "/users/7") {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::GET, Method::HEAD, Method::POST]);
            }
            other => panic!("unexpected match: {other:?}"),
        }
    }

    #[test]
    fn not_found() {
        assert!(matches!(router().at(&Method::GET, "/users"), RouteMatch::NotFound));
        assert!(matches!(router().at(&Method::GET, "/"), RouteMatch::NotFound));
    }

    #[test]
    fn head_falls_back_to_get() {
        let router = router();
        assert!(matches!(
            router.at(&Method::HEAD, "/users/1"),
            RouteMatch::Matched { .. }
        ));
        // but not to other methods
        let mut router = Router::new();
        router.route(Method::POST, "/form", chain("post")).unwrap();
        assert!(matches!(
            router.at(&Method::HEAD, "/form"),
            RouteMatch::MethodNotAllowed { .. }
        ));
    }

    #[test]
    fn explicit_head_is_listed_once() {
        let mut router = Router::new();
        router
            .route(Method::HEAD, "/files", chain("head"))
            .unwrap()
            .route(Method::GET, "/files", chain("get"))
            .unwrap();
        match router.at(&Method::PUT, "/files") {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::HEAD, Method::GET]);
            }
            other => panic!("unexpected match: {other:?}"),
        }
    }

    #[test]
    fn duplicate_route_is_rejected() {
        let mut router = router();
        let err = router
            .route(Method::GET, "/users/{id}", chain("again"))
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(err.to_string(), "route GET \"/users/{id}\" is already registered");
    }

    #[test]
    fn conflicting_pattern_is_rejected() {
        let mut router = router();
        let err = router
            .route(Method::GET, "/users/{name}", chain("conflict"))
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn any_and_map() {
        let mut router = Router::new();
        router.any("/anything", chain("any")).unwrap();
        router
            .map(&[Method::PUT, Method::PATCH], "/items/{id}", chain("update"))
            .unwrap();

        for method in STANDARD_METHODS {
            assert!(matches!(
                router.at(&method, "/anything"),
                RouteMatch::Matched { .. }
            ));
        }
        match router.at(&Method::GET, "/items/1") {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, [Method::PUT, Method::PATCH]);
            }
            other => panic!("unexpected match: {other:?}"),
        }
        assert_eq!(router.routes().count(), STANDARD_METHODS.len() + 2);
    }
}
