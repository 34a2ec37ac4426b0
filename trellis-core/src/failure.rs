use std::any::Any;
use std::fmt;
use trellis_error::{BoxError, OpaqueError};

/// The single failure type a [`HandlerResult`] can settle with.
///
/// [`HandlerResult`]: crate::HandlerResult
#[derive(Debug)]
pub enum Failure {
    /// Raised by user-supplied handler code, be it synchronously,
    /// through a [`Deferred`] or from within a [`Suspendable`] sequence.
    ///
    /// [`Deferred`]: crate::Deferred
    /// [`Suspendable`]: crate::Suspendable
    Application(BoxError),
    /// A handler panicked while it was being invoked or polled.
    Panic(String),
    /// The last handler in a chain invoked its `next` continuation.
    NoNextHandler,
    /// A wrapping handler invoked the same `next` continuation more than once.
    NextCalledTwice,
    /// A suspendable sequence was resumed with a value it cannot use.
    InvalidYield {
        /// Type name of the value the sequence expected.
        expected: &'static str,
    },
}

/// Coarse classification of a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Failure of the application logic, answered with a 500-class response.
    Application,
    /// Framework usage error, additionally reported to the operator.
    ContractViolation,
}

impl Failure {
    /// Create an application [`Failure`] from any boxable error.
    pub fn application(error: impl Into<BoxError>) -> Self {
        Self::Application(error.into())
    }

    /// Create a [`Failure`] from a panic payload as caught by `catch_unwind`.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self::Panic(msg)
    }

    /// Classify this failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Application(_) | Self::Panic(_) => FailureKind::Application,
            Self::NoNextHandler | Self::NextCalledTwice | Self::InvalidYield { .. } => {
                FailureKind::ContractViolation
            }
        }
    }

    /// Returns `true` if this failure is a framework usage error.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        self.kind() == FailureKind::ContractViolation
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application(err) => err.fmt(f),
            Self::Panic(msg) => write!(f, "handler panicked: {msg}"),
            Self::NoNextHandler => {
                f.write_str("last handler in the chain invoked its next handler")
            }
            Self::NextCalledTwice => f.write_str("next handler invoked more than once"),
            Self::InvalidYield { expected } => {
                write!(f, "suspendable resumed with a value that is not a `{expected}`")
            }
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Application(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<BoxError> for Failure {
    fn from(error: BoxError) -> Self {
        Self::Application(error)
    }
}

impl From<OpaqueError> for Failure {
    fn from(error: OpaqueError) -> Self {
        Self::Application(error.into_boxed())
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => f.write_str("application failure"),
            Self::ContractViolation => f.write_str("contract violation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_error::ErrorContext;

    #[test]
    fn classify() {
        assert_eq!(
            Failure::application("boom").kind(),
            FailureKind::Application
        );
        assert_eq!(Failure::Panic("x".to_owned()).kind(), FailureKind::Application);
        assert!(Failure::NoNextHandler.is_contract_violation());
        assert!(Failure::NextCalledTwice.is_contract_violation());
        assert!(Failure::InvalidYield { expected: "u8" }.is_contract_violation());
    }

    #[test]
    fn panic_payload_message() {
        let failure = Failure::from_panic(Box::new("static message"));
        assert_eq!(failure.to_string(), "handler panicked: static message");

        let failure = Failure::from_panic(Box::new(String::from("owned message")));
        assert_eq!(failure.to_string(), "handler panicked: owned message");

        let failure = Failure::from_panic(Box::new(42u32));
        assert_eq!(failure.to_string(), "handler panicked: unknown panic payload");
    }

    #[test]
    fn application_keeps_source() {
        let failure: Failure = "42x"
            .parse::<u32>()
            .context("parse user id")
            .unwrap_err()
            .into();
        assert_eq!(
            failure.to_string(),
            "parse user id: invalid digit found in string"
        );
        assert!(std::error::Error::source(&failure).is_some());
    }
}
