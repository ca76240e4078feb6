//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;

use super::{from_fn, Middleware};
use crate::response::Response;

/// Turns a panicking handler into `500 Internal Server Error` instead of a
/// dropped connection. Place it first so it guards every other layer.
pub fn recover() -> Middleware {
    from_fn(|req, next| async move {
        let method = req.method().clone();
        let path = req.path().to_owned();

        // `run` may panic before handing back a future (closure handlers do
        // their synchronous work there), so guard both phases.
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| next.run(req))) {
            Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        outcome.unwrap_or_else(|panic| {
            error!(%method, %path, panic = panic_message(&*panic), "handler panicked");
            Response::error(StatusCode::INTERNAL_SERVER_ERROR)
        })
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::compose;
    use crate::Request;

    #[tokio::test]
    async fn async_panic_becomes_500() {
        async fn boom(req: Request) -> &'static str {
            if req.path() == "/boom" {
                panic!("boom");
            }
            "fine"
        }

        let chain = compose(&[recover()], boom.into_boxed_handler());
        let res = chain.call(Request::new(Method::GET, "/boom")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = chain.call(Request::new(Method::GET, "/ok")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sync_panic_becomes_500() {
        let handler = (|req: Request| {
            if req.path() == "/boom" {
                panic!("before the future exists");
            }
            async { "fine" }
        })
        .into_boxed_handler();

        let chain = compose(&[recover()], handler);
        let res = chain.call(Request::new(Method::GET, "/boom")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
