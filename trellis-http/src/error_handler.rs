use crate::pages::{ErrorPage, render};
use crate::response::IntoResponse;
use crate::{DispatcherConfig, Response};
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use trellis_core::telemetry::tracing;
use trellis_core::{Failure, FailureKind};
use trellis_error::ErrorExt;

/// Tracing target on which contract violations are reported.
pub const OPERATOR_TARGET: &str = "trellis::operator";

/// Operator-facing hook invoked for every contract violation.
pub type Reporter = Arc<dyn Fn(&Failure) + Send + Sync>;

/// Maps routing failures and handler failures to [`Response`]s.
///
/// Error pages are small HTML documents. Failure details only end up
/// in the page when [`DispatcherConfig::debug`] is enabled.
#[derive(Clone, Default)]
pub struct ErrorHandler {
    debug: bool,
    reporter: Option<Reporter>,
}

impl ErrorHandler {
    /// Create a new [`ErrorHandler`] for the given config.
    #[must_use]
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            debug: config.debug,
            reporter: None,
        }
    }

    /// Attach a [`Reporter`] which is notified of contract violations.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Attach a [`Reporter`] which is notified of contract violations.
    pub fn set_reporter(&mut self, reporter: Reporter) -> &mut Self {
        self.reporter = Some(reporter);
        self
    }

    /// Returns `true` if failure details are rendered into error pages.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// The 404 response for a path no route matches.
    #[must_use]
    pub fn not_found(&self) -> Response {
        let page = ErrorPage {
            title: "Error 404: Page Not Found",
            message: "The requested resource could not be found on this server.",
            detail: None,
        };
        (StatusCode::NOT_FOUND, render(&page)).into_response()
    }

    /// The 405 response for a path which has routes, but not for the request method.
    #[must_use]
    pub fn method_not_allowed(&self, allowed: &[Method]) -> Response {
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!("Allowed methods: {allow}.");
        let page = ErrorPage {
            title: "Error 405: Method Not Allowed",
            message: &message,
            detail: None,
        };
        let mut res = (StatusCode::METHOD_NOT_ALLOWED, render(&page)).into_response();
        match HeaderValue::from_str(&allow) {
            Ok(value) => {
                res.headers_mut().insert(header::ALLOW, value);
            }
            Err(err) => {
                tracing::debug!("failed to encode allow header value {allow:?}: {err}");
            }
        }
        res
    }

    /// The response for a failure which surfaced from a handler chain.
    ///
    /// Contract violations are also reported to the operator.
    #[must_use]
    pub fn failure(&self, failure: &Failure) -> Response {
        let kind = failure.kind();
        match kind {
            FailureKind::ContractViolation => {
                tracing::event!(
                    target: OPERATOR_TARGET,
                    tracing::Level::ERROR,
                    failure.kind = %kind,
                    "contract violation while dispatching request: {failure}"
                );
                if let Some(reporter) = &self.reporter {
                    reporter(failure);
                }
            }
            FailureKind::Application => {
                tracing::warn!(
                    failure.kind = %kind,
                    "handler chain failed: {failure}"
                );
            }
        }

        let page = ErrorPage {
            title: "Error 500: Internal Server Error",
            message: "The server encountered an unexpected condition that prevented it from fulfilling the request.",
            detail: self.debug.then(|| failure_detail(failure)),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, render(&page)).into_response()
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("debug", &self.debug)
            .field("reporter", &self.reporter.is_some())
            .finish()
    }
}

/// The failure and its causes, one per line.
///
/// A cause whose message is already included in the line above it
/// (as context-wrapped errors display their source) is skipped.
fn failure_detail(failure: &Failure) -> String {
    let mut lines: Vec<String> = Vec::new();
    for cause in failure.chain() {
        let message = cause.to_string();
        if lines.last().is_some_and(|last| last.ends_with(&message)) {
            continue;
        }
        lines.push(message);
    }
    let mut detail = format!("{}: {}", failure.kind(), lines.first().map_or("", String::as_str));
    for cause in lines.iter().skip(1) {
        detail.push_str("\ncaused by: ");
        detail.push_str(cause);
    }
    detail
}
