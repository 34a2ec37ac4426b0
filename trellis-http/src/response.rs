//! Types and traits to turn handler output into a [`Response`].

use crate::pages::{RedirectPage, render};
use crate::{Body, Response};
use bytes::Bytes;
use http::header::{self, HeaderValue, InvalidHeaderValue};
use http::StatusCode;
use std::borrow::Cow;
use std::convert::Infallible;

/// Trait for generating responses.
///
/// Types that implement `IntoResponse` can be returned from endpoints.
pub trait IntoResponse {
    /// Create a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Body {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Body::empty().into_response()
    }
}

impl IntoResponse for Infallible {
    fn into_response(self) -> Response {
        match self {}
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut res = ().into_response();
        *res.status_mut() = self;
        res
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Cow::Borrowed(self).into_response()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Cow::<'static, str>::Owned(self).into_response()
    }
}

impl IntoResponse for Cow<'static, str> {
    fn into_response(self) -> Response {
        let body = match self {
            Cow::Borrowed(s) => Body::from(s),
            Cow::Owned(s) => Body::from(s),
        };
        let mut res = body.into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        let mut res = Body::from(self).into_response();
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        res
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        let (status, inner) = self;
        let mut res = inner.into_response();
        *res.status_mut() = status;
        res
    }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse,
{
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// An HTML response.
///
/// Will automatically get `Content-Type: text/html; charset=utf-8`.
#[derive(Debug, Clone, Copy)]
pub struct Html<T>(pub T);

impl<T> IntoResponse for Html<T>
where
    T: Into<Body>,
{
    fn into_response(self) -> Response {
        let mut res = Response::new(self.0.into());
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        res
    }
}

impl<T> From<T> for Html<T> {
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

/// Utility struct to easily create a redirect response.
#[derive(Debug, Clone)]
pub struct Redirect {
    loc: HeaderValue,
    status: StatusCode,
}

impl Redirect {
    /// Create a redirect to `loc` with the given (3xx) status.
    #[must_use]
    pub fn to(loc: HeaderValue, status: StatusCode) -> Self {
        Self { loc, status }
    }

    /// Create a new temporary (307) redirect response.
    pub fn temporary(loc: impl AsRef<str>) -> Result<Self, InvalidHeaderValue> {
        Ok(Self::to(
            HeaderValue::from_str(loc.as_ref())?,
            StatusCode::TEMPORARY_REDIRECT,
        ))
    }

    /// Create a new permanent (308) redirect response.
    pub fn permanent(loc: impl AsRef<str>) -> Result<Self, InvalidHeaderValue> {
        Ok(Self::to(
            HeaderValue::from_str(loc.as_ref())?,
            StatusCode::PERMANENT_REDIRECT,
        ))
    }

    /// Create a new see-other (303) redirect response,
    /// commonly used after a form submission.
    pub fn see_other(loc: impl AsRef<str>) -> Result<Self, InvalidHeaderValue> {
        Ok(Self::to(
            HeaderValue::from_str(loc.as_ref())?,
            StatusCode::SEE_OTHER,
        ))
    }

    /// The location this redirect points to.
    #[must_use]
    pub fn location(&self) -> &HeaderValue {
        &self.loc
    }

    /// The status code of the redirect response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let body = match self.loc.to_str() {
            Ok(location) => render(&RedirectPage { location }),
            Err(_) => Html(String::new()),
        };
        let mut res = (self.status, body).into_response();
        res.headers_mut().insert(header::LOCATION, self.loc);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_and_status() {
        let res = (StatusCode::CREATED, "made").into_response();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(res.into_body().collect_string().await.unwrap(), "made");
    }

    #[test]
    fn status_only() {
        let res = StatusCode::NO_CONTENT.into_response();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(res.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn html() {
        let res = Html("<p>hi</p>").into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(res.into_body().collect_string().await.unwrap(), "<p>hi</p>");
    }

    #[tokio::test]
    async fn redirect() {
        let res = Redirect::see_other("/login?next=<x>").unwrap().into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/login?next=<x>");
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = res.into_body().collect_string().await.unwrap();
        assert!(body.contains("&lt;x&gt;"));
        assert!(!body.contains("<x>"));
    }

    #[test]
    fn redirect_rejects_invalid_location() {
        assert!(Redirect::temporary("/bad\nheader").is_err());
    }
}
