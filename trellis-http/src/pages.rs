//! HTML pages rendered by trellis itself, see `templates/`.

use crate::response::Html;
use askama::Template;
use trellis_core::telemetry::tracing;

/// Page answering a routing failure or a failed handler chain.
#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorPage<'a> {
    pub(crate) title: &'a str,
    pub(crate) message: &'a str,
    pub(crate) detail: Option<String>,
}

/// Body of a redirect response, for clients which do not follow `Location`.
#[derive(Template)]
#[template(path = "redirect.html")]
pub(crate) struct RedirectPage<'a> {
    pub(crate) location: &'a str,
}

/// Render a page, falling back to an empty document if rendering fails.
pub(crate) fn render<T: Template>(page: &T) -> Html<String> {
    Html(page.render().unwrap_or_else(|err| {
        tracing::error!("failed to render trellis page: {err}");
        String::new()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_page_escapes_all_fields() {
        let Html(html) = render(&ErrorPage {
            title: "Error <1>",
            message: "a & b",
            detail: Some("<script>".to_owned()),
        });
        assert!(html.contains("<title>Error &lt;1&gt;</title>"));
        assert!(html.contains("<p>a &amp; b</p>"));
        assert!(html.contains("<pre>&lt;script&gt;</pre>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn error_page_without_detail() {
        let Html(html) = render(&ErrorPage {
            title: "Error 404: Page Not Found",
            message: "gone",
            detail: None,
        });
        assert!(html.contains("<h1>Error 404: Page Not Found</h1>"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn redirect_page() {
        let Html(html) = render(&RedirectPage {
            location: "/login?next=<x>",
        });
        assert!(html.contains("Redirecting to <a href="));
        assert!(html.contains("&lt;x&gt;"));
        assert!(!html.contains("<x>"));
    }
}
