use crate::{HttpNext, Request, Response};
use http::{Method, StatusCode};
use std::time::{Duration, Instant};
use trellis_core::telemetry::tracing;
use trellis_core::{Failure, Handler, HandlerResult};

/// Global handler which logs one event per served request.
///
/// The event is emitted at `INFO` level once the rest of the chain
/// settled, with the method, path, final status and elapsed time.
/// A chain which failed is logged with status `500`, which is what the
/// dispatcher ends up answering with.
#[derive(Debug, Clone, Default)]
pub struct AccessLog;

impl AccessLog {
    /// Create a new [`AccessLog`] handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Handler<Request, Response> for AccessLog {
    fn handle(&self, req: Request, next: HttpNext) -> HandlerResult<Response> {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let start = Instant::now();

        match next.run(req) {
            HandlerResult::Immediate(res) => {
                log_request(&method, &path, res.status(), start.elapsed());
                HandlerResult::Immediate(res)
            }
            HandlerResult::Failed(failure) => {
                log_failure(&method, &path, &failure, start.elapsed());
                HandlerResult::Failed(failure)
            }
            pending => HandlerResult::deferred(async move {
                let result = pending.resolve().await;
                match &result {
                    Ok(res) => log_request(&method, &path, res.status(), start.elapsed()),
                    Err(failure) => log_failure(&method, &path, failure, start.elapsed()),
                }
                result
            }),
        }
    }
}

fn log_failure(method: &Method, path: &str, failure: &Failure, elapsed: Duration) {
    tracing::debug!("request {method} {path} failed: {failure}");
    log_request(method, path, StatusCode::INTERNAL_SERVER_ERROR, elapsed);
}

fn log_request(method: &Method, path: &str, status: StatusCode, elapsed: Duration) {
    tracing::info!(
        http.request.method = %method,
        url.path = path,
        http.response.status_code = status.as_u16(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "{method} {path} {}",
        status.as_u16(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Body, HttpChain, IntoResponse};
    use ::tracing;
    use tracing_test::traced_test;
    use trellis_core::terminal_fn;

    fn get(path: &str) -> Request {
        Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_immediate_response() {
        let chain = HttpChain::new([
            AccessLog::new().boxed(),
            terminal_fn(|_req: Request| HandlerResult::Immediate(StatusCode::ACCEPTED.into_response()))
                .boxed(),
        ]);

        let res = chain.call(get("/jobs")).resolve().await.unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert!(logs_contain("GET /jobs 202"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn logs_deferred_response_once_settled() {
        let chain = HttpChain::new([
            AccessLog::new().boxed(),
            terminal_fn(|_req: Request| {
                HandlerResult::deferred(async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok("done".into_response())
                })
            })
            .boxed(),
        ]);

        let result = chain.call(get("/slow"));
        assert!(!logs_contain("GET /slow"));
        let res = result.resolve().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(logs_contain("GET /slow 200"));
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_failure_as_500() {
        let chain = HttpChain::new([
            AccessLog::new().boxed(),
            terminal_fn(|_req: Request| HandlerResult::Failed(Failure::application("boom"))).boxed(),
        ]);

        let failure = chain.call(get("/fail")).resolve().await.unwrap_err();
        assert_eq!(failure.to_string(), "boom");
        assert!(logs_contain("GET /fail 500"));
    }
}
