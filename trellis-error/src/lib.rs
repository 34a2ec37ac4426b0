//! Error utilities for trellis.
//!
//! The [`BoxError`] type is a type-erased error type that can be used to represent any error that
//! implements the `std::error::Error` trait. It is used wherever it is not that important
//! which specific error was returned, only that one occurred, such as the application
//! failures raised by request handlers.
//!
//! One can still downcast the error, or walk its sources using [`ErrorExt`].

#![cfg_attr(docsrs, feature(doc_cfg))]

use std::error::Error as StdError;

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn StdError + Send + Sync>;

mod ext;
pub use ext::{ErrorContext, ErrorExt, OpaqueError};
