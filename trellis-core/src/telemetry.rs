//! Telemetry re-exports, for your convenience.

pub mod tracing {
    //! Tracing core re-export.

    #[doc(inline)]
    pub use ::tracing::*;
}
