//! The application shell: a router, a global middleware stack and the
//! settings needed to serve them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::handler::{private, BoxedHandler, Handler};
use crate::middleware::{self, compose, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::server::{Server, DEFAULT_SHUTDOWN_TIMEOUT};

/// Listen address used unless [`App::addr`] says otherwise.
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// A named application ready to serve.
///
/// ```rust,no_run
/// use flow::{middleware, App, Request, Router};
///
/// #[tokio::main]
/// async fn main() -> Result<(), flow::Error> {
///     let router = Router::new().get("/", |_req: Request| async { "hello" });
///
///     App::new("blog")
///         .router(router)
///         .use_middleware(middleware::recover())
///         .use_middleware(middleware::trace())
///         .serve()
///         .await
/// }
/// ```
pub struct App {
    name: String,
    addr: String,
    shutdown_timeout: Duration,
    endpoint: BoxedHandler,
    middleware: Vec<Middleware>,
}

impl App {
    /// An app with an empty router (every request is a 404), listening on
    /// [`DEFAULT_ADDR`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: DEFAULT_ADDR.to_owned(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            endpoint: Router::new().into_boxed_handler(),
            middleware: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the router.
    pub fn router(mut self, router: Router) -> Self {
        self.endpoint = router.into_boxed_handler();
        self
    }

    /// Appends a global middleware. Layers run in registration order: the
    /// first one registered sees the request first.
    pub fn use_middleware(mut self, m: Middleware) -> Self {
        self.middleware.push(m);
        self
    }

    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The router wrapped in every global middleware.
    pub fn handler(&self) -> BoxedHandler {
        compose(&self.middleware, Arc::clone(&self.endpoint))
    }

    /// Runs one request through the full stack without a socket.
    pub async fn dispatch(&self, req: Request) -> Response {
        self.handler().call(req).await
    }

    /// Serves until SIGTERM or Ctrl-C.
    pub async fn serve(self) -> Result<(), Error> {
        tracing::info!(app = %self.name, "starting");
        Server::bind(self.addr.clone())
            .shutdown_timeout(self.shutdown_timeout)
            .serve(self)
            .await
    }

    /// Serves until `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        tracing::info!(app = %self.name, "starting");
        Server::bind(self.addr.clone())
            .shutdown_timeout(self.shutdown_timeout)
            .serve_with_shutdown(self, signal)
            .await
    }
}

impl private::Sealed for App {}

impl Handler for App {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.handler()
    }
}

/// The stack `flow serve` runs with: panic recovery outermost, then request
/// ids, tracing and the `x-response-time` header.
pub fn default_middleware() -> Vec<Middleware> {
    vec![
        middleware::recover(),
        middleware::request_id(""),
        middleware::trace(),
        middleware::response_time(),
    ]
}
