use crate::BoxError;
use std::error::Error;
use std::fmt;

#[repr(transparent)]
/// A type-erased error which keeps its source chain intact.
///
/// Used to hide concrete error types at crate boundaries,
/// e.g. when collecting a request body fails.
pub struct OpaqueError(BoxError);

impl OpaqueError {
    /// Create an [`OpaqueError`] from an std error.
    pub fn from_std(error: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(error))
    }

    /// Create an [`OpaqueError`] from a boxed error.
    #[must_use]
    pub fn from_boxed(inner: BoxError) -> Self {
        Self(inner)
    }

    /// Consume the [`OpaqueError`] and return the inner [`BoxError`].
    #[must_use]
    pub fn into_boxed(self) -> BoxError {
        self.0
    }
}

impl fmt::Debug for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for OpaqueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for OpaqueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Placeholder error for an absent [`Option`] value.
#[derive(Debug)]
struct Missing;

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is missing")
    }
}

impl Error for Missing {}

/// An error annotated with what was being done when it occurred.
///
/// Displays as `context: error`, and reports the annotated error as its source.
#[derive(Debug)]
struct Annotated<C, E> {
    context: C,
    error: E,
}

impl<C: fmt::Display, E: fmt::Display> fmt::Display for Annotated<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}

impl<C, E> Error for Annotated<C, E>
where
    C: fmt::Display + fmt::Debug,
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Annotate the error of a `Result`, or the absence of an `Option` value.
///
/// ```
/// use trellis_error::ErrorContext;
///
/// let result = "8o".parse::<u16>().context("parse port");
/// assert_eq!(result.unwrap_err().to_string(), "parse port: invalid digit found in string");
///
/// let missing = None::<u16>.context("read port");
/// assert_eq!(missing.unwrap_err().to_string(), "read port: value is missing");
/// ```
pub trait ErrorContext<T>: private::SealedContext {
    /// Annotate the error with `context`.
    fn context<C>(self, context: C) -> Result<T, OpaqueError>
    where
        C: fmt::Display + fmt::Debug + Send + Sync + 'static;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, OpaqueError>
    where
        C: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.map_err(|error| error.context(context))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T, OpaqueError>
    where
        C: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.ok_or_else(|| Missing.context(context))
    }
}

/// Extends errors with context annotation and source chain traversal.
pub trait ErrorExt: private::SealedError {
    /// Annotate this error with `context`.
    fn context<C>(self, context: C) -> OpaqueError
    where
        C: fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Iterate over this error followed by all of its sources.
    fn chain(&self) -> impl Iterator<Item = &(dyn Error + 'static)>;
}

impl<E: Error + Send + Sync + 'static> ErrorExt for E {
    fn context<C>(self, context: C) -> OpaqueError
    where
        C: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        OpaqueError::from_std(Annotated {
            context,
            error: self,
        })
    }

    fn chain(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        let first: &(dyn Error + 'static) = self;
        std::iter::successors(Some(first), |&error| error.source())
    }
}

mod private {
    pub trait SealedContext {}

    impl<T, E> SealedContext for Result<T, E> where E: std::error::Error + Send + Sync + 'static {}
    impl<T> SealedContext for Option<T> {}

    pub trait SealedError {}

    impl<E: std::error::Error + Send + Sync + 'static> SealedError for E {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection refused")
        }
    }

    impl Error for Refused {}

    #[test]
    fn context_on_error() {
        let error = Refused.context("connect to database");
        assert_eq!(error.to_string(), "connect to database: connection refused");
        assert!(error.source().is_some_and(|source| source.is::<Refused>()));
    }

    #[test]
    fn context_on_none() {
        let error = None::<u8>.context("load session").unwrap_err();
        assert_eq!(error.to_string(), "load session: value is missing");
    }

    #[test]
    fn chain_walks_all_sources() {
        let error = Refused.context("connect").context("load user");
        // opaque wrappers forward to their annotation: load user, connect, refused
        let messages: Vec<_> = error.chain().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            [
                "load user: connect: connection refused",
                "connect: connection refused",
                "connection refused",
            ]
        );
    }

    #[test]
    fn boxed_round_trip() {
        let boxed: BoxError = Refused.context("dial").into_boxed();
        assert_eq!(boxed.to_string(), "dial: connection refused");
        assert_eq!(OpaqueError::from_boxed(boxed).to_string(), "dial: connection refused");
    }
}
