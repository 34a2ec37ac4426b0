//! `fn handle(&self, Req, Next<Req, Res>) -> HandlerResult<Res>`
//!
//! # trellis core
//!
//! The request-agnostic half of trellis: the [`Handler`] capability,
//! the [`HandlerResult`] union that lets a handler answer immediately,
//! through a [`Deferred`] value or through a [`Suspendable`] step sequence,
//! and the [`Chain`] which threads a [`Next`] continuation through
//! an ordered list of handlers.
//!
//! Whatever shape a handler picks, [`HandlerResult::resolve`] (or [`execute`]
//! for a whole chain) turns it into exactly one `Result<Res, Failure>`,
//! suspending only where a [`Deferred`] value is awaited.
//!
//! ```
//! use trellis_core::{Chain, Handler, HandlerResult, handler_fn, terminal_fn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let chain = Chain::new([
//!     handler_fn(|req: String, next| next.run(format!("{req}!"))).boxed(),
//!     terminal_fn(|req: String| HandlerResult::deferred(async move { Ok(req.len()) })).boxed(),
//! ]);
//!
//! let len = trellis_core::execute(&chain, "hello".to_owned()).await.unwrap();
//! assert_eq!(len, 6);
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod telemetry;

mod failure;
#[doc(inline)]
pub use failure::{Failure, FailureKind};

mod result;
#[doc(inline)]
pub use result::{Deferred, HandlerResult};

pub mod suspend;
#[doc(inline)]
pub use suspend::{Resume, Step, Suspendable, Yielded};

mod handler;
#[doc(inline)]
pub use handler::{BoxHandler, Handler, HandlerFn, TerminalFn, handler_fn, terminal_fn};

mod chain;
#[doc(inline)]
pub use chain::{Chain, Next};

mod normalize;
#[doc(inline)]
pub use normalize::execute;

pub mod error {
    //! Error types re-exported from `trellis-error`.

    #[doc(inline)]
    pub use trellis_error::*;
}
