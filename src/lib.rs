//! trellis is a middleware composition and async dispatch engine
//! for micro web frameworks.
//!
//! An incoming request is resolved to an ordered chain of handlers
//! (global middleware, route middleware and the final controller), the
//! chain is executed and exactly one response comes out. Each handler can
//! answer immediately, through a deferred value or through a suspendable
//! step sequence, and the caller never has to care which one it picked.
//!
//! The crates making up trellis:
//!
//! - [`core`]: the request-agnostic [`Handler`](core::Handler),
//!   [`HandlerResult`](core::HandlerResult) and [`Chain`](core::Chain);
//! - [`http`]: the [`Dispatcher`](http::Dispatcher), its router adapter
//!   and error pages, on top of the `http` crate types;
//! - [`error`]: error utilities shared by all of the above.
//!
//! ```
//! use trellis::http::{Body, Dispatcher, Request, StatusCode, endpoint};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::builder()
//!     .with_get("/hello/{name}", endpoint(|req: Request| {
//!         use trellis::http::RequestExt;
//!         format!("Hello {}!", req.path_param("name").unwrap_or("stranger"))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let req = Request::builder().uri("/hello/trellis").body(Body::empty()).unwrap();
//! let res = dispatcher.dispatch(req).await;
//! assert_eq!(res.status(), StatusCode::OK);
//! assert_eq!(res.into_body().collect_string().await.unwrap(), "Hello trellis!");
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use trellis_core as core;

#[doc(inline)]
pub use trellis_error as error;

#[doc(inline)]
pub use trellis_http as http;

pub mod telemetry {
    //! Telemetry re-exports, for your convenience.

    #[doc(inline)]
    pub use trellis_core::telemetry::tracing;
}
