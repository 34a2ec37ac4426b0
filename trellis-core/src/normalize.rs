use crate::telemetry::tracing;
use crate::{Chain, Failure};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;

/// Invoke the chain with the given request and resolve its outcome.
///
/// This is the single place where a [`HandlerResult`] of any shape is
/// turned into exactly one `Result<Res, Failure>`. A panic raised while
/// invoking or polling any handler of the chain is caught and reported
/// as [`Failure::Panic`].
///
/// [`HandlerResult`]: crate::HandlerResult
pub async fn execute<Req, Res>(chain: &Chain<Req, Res>, req: Req) -> Result<Res, Failure>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    let future = AssertUnwindSafe(async move { chain.call(req).resolve().await });
    match future.catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let failure = Failure::from_panic(payload);
            tracing::debug!("caught panic from handler chain: {failure}");
            Err(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handler, HandlerResult, Next, handler_fn, terminal_fn};

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn synchronous_panic_becomes_failure() {
        let chain = Chain::new([terminal_fn(|_req: u8| -> HandlerResult<u8> {
            panic!("sync boom")
        })
        .boxed()]);

        let failure = execute(&chain, 1).await.unwrap_err();
        assert!(matches!(&failure, Failure::Panic(msg) if msg == "sync boom"));
        assert!(!failure.is_contract_violation());
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn deferred_panic_becomes_failure() {
        let chain = Chain::new([
            handler_fn(|req: u8, next: Next<u8, u8>| next.run(req)).boxed(),
            terminal_fn(|req: u8| {
                HandlerResult::deferred(async move {
                    tokio::task::yield_now().await;
                    if req > 0 {
                        panic!("deferred boom {req}");
                    }
                    Ok(req)
                })
            })
            .boxed(),
        ]);

        let failure = execute(&chain, 3).await.unwrap_err();
        assert_eq!(failure.to_string(), "handler panicked: deferred boom 3");

        assert_eq!(execute(&chain, 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn contract_violations_pass_through() {
        let chain = Chain::new([handler_fn(|req: u8, next: Next<u8, u8>| next.run(req)).boxed()]);
        assert!(matches!(
            execute(&chain, 1).await,
            Err(Failure::NoNextHandler)
        ));
    }
}
