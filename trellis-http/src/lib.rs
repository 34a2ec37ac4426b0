//! HTTP dispatch for trellis.
//!
//! A [`Dispatcher`] resolves an incoming [`Request`] to its handler chain
//! through the [`Router`], runs the chain and always produces a [`Response`]:
//! routing failures become 404 and 405 pages, failures raised by handlers
//! become 500 pages rendered by the [`ErrorHandler`].
//!
//! ```
//! use trellis_core::handler_fn;
//! use trellis_http::{Body, Dispatcher, HttpNext, Request, RequestExt, StatusCode, endpoint};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let auth = handler_fn(|req: Request, next: HttpNext| {
//!     let admin = req.headers().get("x-admin").is_some_and(|v| v == "1");
//!     next.run(req.with_attribute("admin", admin))
//! });
//!
//! let dispatcher = Dispatcher::builder()
//!     .with_middleware(auth)
//!     .with_get("/hello", endpoint(|req: Request| {
//!         if req.attribute::<bool>("admin") == Some(&true) {
//!             "Hello admin!"
//!         } else {
//!             "Hello user!"
//!         }
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let req = Request::builder()
//!     .uri("/hello")
//!     .header("x-admin", "1")
//!     .body(Body::empty())
//!     .unwrap();
//! let res = dispatcher.dispatch(req).await;
//! assert_eq!(res.status(), StatusCode::OK);
//! assert_eq!(res.into_body().collect_string().await.unwrap(), "Hello admin!");
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};

pub mod body;
#[doc(inline)]
pub use body::Body;

/// Type alias for [`http::Request`] whose body type defaults to [`Body`].
pub type Request<T = Body> = http::Request<T>;

/// Type alias for [`http::Response`] whose body type defaults to [`Body`].
pub type Response<T = Body> = http::Response<T>;

/// A type-erased handler of [`Request`]s.
pub type HttpHandler = trellis_core::BoxHandler<Request, Response>;

/// A chain of [`HttpHandler`]s.
pub type HttpChain = trellis_core::Chain<Request, Response>;

/// The continuation handed to a [`Request`] handler.
pub type HttpNext = trellis_core::Next<Request, Response>;

mod attributes;
#[doc(inline)]
pub use attributes::{Attributes, RequestExt};

pub mod response;
#[doc(inline)]
pub use response::{Html, IntoResponse, Redirect};

mod endpoint;
#[doc(inline)]
pub use endpoint::{async_endpoint, endpoint};

pub mod router;
#[doc(inline)]
pub use router::{RouteError, RouteMatch, Router};

mod config;
#[doc(inline)]
pub use config::{DEBUG_ENV_VAR, DispatcherConfig};

mod pages;

mod error_handler;
#[doc(inline)]
pub use error_handler::{ErrorHandler, OPERATOR_TARGET, Reporter};

mod access_log;
#[doc(inline)]
pub use access_log::AccessLog;

pub mod dispatcher;
#[doc(inline)]
pub use dispatcher::{Dispatcher, DispatcherBuilder};
