//! Segment-matching request router.
//!
//! Routes live in one ordered table and are scanned in registration order.
//! The first route whose shape matches the path **and** whose method matches
//! the request wins. A route whose shape matches but whose method does not
//! only records that fact and the scan continues, so a later route with the
//! same shape can still answer. After a full scan the router answers 405 if
//! some shape matched, 404 otherwise.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use flow::{Request, Response, Router};
//! use http::Method;
//!
//! async fn show(req: Request) -> Response {
//!     Response::text(req.param("id").unwrap_or_default().to_owned())
//! }
//!
//! let router = Router::new()
//!     .handle_named("post_show", Method::GET, "/posts/:id", show)
//!     .post("/posts", |_req: Request| async { "created" });
//!
//! let href = router.url("post_show", &HashMap::from([("id", "42")])).unwrap();
//! assert_eq!(href, "/posts/42");
//! ```
//!
//! The table is built once at startup and never changes afterwards, so it is
//! shared across connection tasks behind an `Arc` with no locking.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use http::{Method, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{compose, Middleware};
use crate::request::{Params, Request};
use crate::response::Response;

mod path;
mod resource;

pub use resource::Resource;

use path::{escape_segment, match_segments, parse_pattern, Segment};

/// Failure to build a URL for a named route.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("router: unknown route {0}")]
    UnknownRoute(String),

    #[error("router: missing param {param} for route {route}")]
    MissingParam { route: String, param: String },
}

/// Failure to register a resource.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("router: resources base cannot be empty")]
    EmptyBase,
}

/// One registered endpoint.
struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    name: Option<String>,
    /// The handler with this route's middleware already composed around it.
    endpoint: BoxedHandler,
}

/// A read-only view of a registered route, in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteInfo<'a> {
    pub method: &'a Method,
    pub pattern: &'a str,
    pub name: Option<&'a str>,
}

/// Outcome of scanning the route table for one request.
enum Lookup<'a> {
    Found(&'a Route, Params),
    MethodNotAllowed,
    NotFound,
}

/// The application router.
///
/// Build it once at startup; every registration call takes and returns
/// `self` so calls chain naturally.
///
/// # Panics
///
/// Registration panics on wiring mistakes, which should abort startup rather
/// than surface at request time:
///
/// - a pattern that does not begin with `/`
/// - a `:` parameter segment with no name
/// - an empty or duplicate route name
pub struct Router {
    routes: Vec<Route>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new(), not_found: None, method_not_allowed: None }
    }

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Parameter segments use `:name` syntax and match exactly one non-empty
    /// path segment; `req.param("name")` retrieves the value.
    pub fn handle(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.add(None, method, pattern, handler.into_boxed_handler(), Vec::new())
    }

    /// Like [`handle`](Router::handle), with middleware that runs only for
    /// this route. The first middleware is the outermost.
    pub fn handle_with(
        self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let middleware = middleware.into_iter().collect();
        self.add(None, method, pattern, handler.into_boxed_handler(), middleware)
    }

    /// Registers a route under a unique `name` for [`url`](Router::url).
    pub fn handle_named(
        self,
        name: &str,
        method: Method,
        pattern: &str,
        handler: impl Handler,
    ) -> Self {
        self.add(Some(name), method, pattern, handler.into_boxed_handler(), Vec::new())
    }

    /// Named registration with per-route middleware.
    pub fn handle_named_with(
        self,
        name: &str,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        middleware: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let middleware = middleware.into_iter().collect();
        self.add(Some(name), method, pattern, handler.into_boxed_handler(), middleware)
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::PUT, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::PATCH, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::DELETE, pattern, handler)
    }

    /// Replaces the default `404 Not Found` response.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the default `405 Method Not Allowed` response.
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(handler.into_boxed_handler());
        self
    }

    fn add(
        mut self,
        name: Option<&str>,
        method: Method,
        pattern: &str,
        handler: BoxedHandler,
        middleware: Vec<Middleware>,
    ) -> Self {
        if let Some(name) = name {
            if name.is_empty() {
                panic!("router: route name cannot be empty");
            }
            if self.routes.iter().any(|r| r.name.as_deref() == Some(name)) {
                panic!("router: duplicate route name {name}");
            }
        }
        if !pattern.starts_with('/') {
            panic!("router: pattern must begin with '/': `{pattern}`");
        }

        let method = uppercase(method);
        debug!(%method, pattern, name, "route registered");
        self.routes.push(Route {
            method,
            pattern: pattern.to_owned(),
            segments: parse_pattern(pattern),
            name: name.map(str::to_owned),
            endpoint: compose(&middleware, handler),
        });
        self
    }

    /// Routes and answers one request.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let segments = req.path_segments();
        match self.lookup(req.method(), &segments) {
            Lookup::Found(route, params) => {
                req.set_params(params);
                route.endpoint.call(req).await
            }
            Lookup::MethodNotAllowed => {
                debug!(method = %req.method(), path = req.path(), "method not allowed");
                match &self.method_not_allowed {
                    Some(handler) => handler.call(req).await,
                    None => Response::error(StatusCode::METHOD_NOT_ALLOWED),
                }
            }
            Lookup::NotFound => {
                debug!(method = %req.method(), path = req.path(), "no route");
                match &self.not_found {
                    Some(handler) => handler.call(req).await,
                    None => Response::error(StatusCode::NOT_FOUND),
                }
            }
        }
    }

    fn lookup(&self, method: &Method, path: &[String]) -> Lookup<'_> {
        let mut method_mismatch = false;

        for route in &self.routes {
            let Some(params) = match_segments(&route.segments, path) else {
                continue;
            };
            if route.method != *method {
                method_mismatch = true;
                continue;
            }
            return Lookup::Found(route, params);
        }

        if method_mismatch { Lookup::MethodNotAllowed } else { Lookup::NotFound }
    }

    /// Builds the path of the route registered as `name`.
    ///
    /// Each parameter segment is replaced by its value from `params`, escaped
    /// as a path segment. Literal segments pass through unchanged and extra
    /// keys in `params` are ignored.
    pub fn url<K, V>(&self, name: &str, params: &HashMap<K, V>) -> Result<String, UrlError>
    where
        K: Borrow<str> + Hash + Eq,
        V: AsRef<str>,
    {
        let route = self
            .routes
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .ok_or_else(|| UrlError::UnknownRoute(name.to_owned()))?;

        if route.segments.is_empty() {
            return Ok("/".to_owned());
        }

        let mut out = String::new();
        for segment in &route.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param(key) => {
                    let value = params.get(key.as_str()).ok_or_else(|| UrlError::MissingParam {
                        route: name.to_owned(),
                        param: key.clone(),
                    })?;
                    out.push_str(&escape_segment(value.as_ref()));
                }
            }
        }
        Ok(out)
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = RouteInfo<'_>> {
        self.routes.iter().map(|r| RouteInfo {
            method: &r.method,
            pattern: &r.pattern,
            name: r.name.as_deref(),
        })
    }
}

/// Registered verbs are compared in upper case, so an extension method
/// spelled `get` is stored as `GET`.
fn uppercase(method: Method) -> Method {
    let upper = method.as_str().to_ascii_uppercase();
    if upper == method.as_str() {
        return method;
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or(method)
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Router as a handler ───────────────────────────────────────────────────────

impl private::Sealed for Router {}

/// Lets a whole router sit behind global middleware.
impl Handler for Router {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(SharedRouter(Arc::new(self)))
    }
}

struct SharedRouter(Arc<Router>);

impl ErasedHandler for SharedRouter {
    fn call(&self, req: Request) -> BoxFuture {
        let router = Arc::clone(&self.0);
        Box::pin(async move { router.dispatch(req).await })
    }
}
