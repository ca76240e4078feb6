//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, request-id injection,
//! timeouts, timing headers and panic recovery.
//!
//! A [`Middleware`] is a function from the next handler to a new handler.
//! [`compose`] stacks a list of them around a terminal handler so that the
//! first one in the list is the **outermost**: it sees the request first and
//! the response last.
//!
//! ```text
//! compose([a, b, c], h)  ==  a(b(c(h)))
//!
//!   request  ──▶ a ──▶ b ──▶ c ──▶ h
//!   response ◀── a ◀── b ◀── c ◀──┘
//! ```
//!
//! Most middleware is easiest to write with [`from_fn`]:
//!
//! ```rust
//! use flow::middleware::{self, Next};
//! use flow::{Request, Response};
//!
//! let powered_by = middleware::from_fn(|req: Request, next: Next| async move {
//!     let mut res: Response = next.run(req).await;
//!     res.headers_mut().insert("x-powered-by", "flow".parse().unwrap());
//!     res
//! });
//! ```
//!
//! Each layer decides whether to call [`Next::run`]; returning early
//! short-circuits the rest of the chain.

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

mod recover;
mod request_id;
mod response_time;
mod timeout;
mod trace;

pub use recover::recover;
pub use request_id::{RequestId, request_id, DEFAULT_REQUEST_ID_HEADER};
pub use response_time::{response_time, RESPONSE_TIME_HEADER};
pub use timeout::{timeout, Deadline};
pub use trace::trace;

/// A handler-wrapping function. See the [module docs](self).
pub type Middleware = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static>;

/// The remainder of the chain, handed to a [`from_fn`] middleware.
#[derive(Clone)]
pub struct Next(BoxedHandler);

impl Next {
    /// Invokes the next stage (another middleware or the terminal handler).
    pub fn run(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

/// Builds a [`Middleware`] from an async closure taking the request and the
/// rest of the chain.
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        Arc::new(FromFn { f: Arc::clone(&f), next: Next(next) })
    })
}

struct FromFn<F> {
    f: Arc<F>,
    next: Next,
}

impl<F, Fut> ErasedHandler for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        Box::pin((self.f)(req, self.next.clone()))
    }
}

/// Wraps `handler` with `layers`, first layer outermost.
pub fn compose(layers: &[Middleware], handler: BoxedHandler) -> BoxedHandler {
    layers.iter().rev().fold(handler, |inner, layer| layer(inner))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use http::{Method, StatusCode};

    use super::*;
    use crate::handler::Handler;

    fn recording(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Middleware {
        let log = Arc::clone(log);
        from_fn(move |req, next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{tag}:before"));
                let res = next.run(req).await;
                log.lock().unwrap().push(format!("{tag}:after"));
                res
            }
        })
    }

    #[tokio::test]
    async fn first_layer_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_log = Arc::clone(&log);
        let handler = (move |_req: Request| {
            let log = Arc::clone(&inner_log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                "ok"
            }
        })
        .into_boxed_handler();

        let chain = compose(&[recording(&log, "a"), recording(&log, "b")], handler);
        let res = chain.call(Request::new(Method::GET, "/")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            ["a:before", "b:before", "handler", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn layer_can_short_circuit() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);
        let deny = from_fn(|_req, _next| async { Response::status(StatusCode::FORBIDDEN) });
        let handler = (move |_req: Request| {
            flag.store(true, Ordering::SeqCst);
            async { "ok" }
        })
        .into_boxed_handler();

        let res = compose(&[deny], handler).call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler() {
        let handler = (|_req: Request| async { StatusCode::NO_CONTENT }).into_boxed_handler();
        let res = compose(&[], handler).call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
    }
}
