//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::HeaderName;
use http::{Extensions, HeaderMap, HeaderValue, Method, Uri};
use percent_encoding::percent_decode_str;

/// Path parameters captured by the router for one request.
///
/// Built fresh for every dispatch and never mutated afterwards. For a route
/// `/orgs/:org_id/users/:id` and a path `/orgs/7/users/99` it holds
/// `{org_id: "7", id: "99"}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    pub(crate) fn from_map(map: HashMap<String, String>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An incoming HTTP request.
///
/// Besides the usual method, URI, headers and body, a request carries two
/// request-scoped stores:
///
/// - [`params`](Request::params): the path parameters bound by the router.
///   Only the matched route's handler (and its middleware) ever sees them.
/// - [`extensions`](Request::extensions): typed values injected by middleware
///   for downstream stages, e.g. [`RequestId`](crate::middleware::RequestId)
///   or [`Deadline`](crate::middleware::Deadline).
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    extensions: Extensions,
}

impl Request {
    /// Builds a bodiless request. Handy in tests and tools.
    ///
    /// # Panics
    ///
    /// Panics if `uri` is not a valid request target.
    pub fn new(method: Method, uri: &str) -> Self {
        let uri: Uri = uri.parse().expect("invalid request uri");
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::default(),
            extensions: Extensions::new(),
        }
    }

    /// Replaces the body. Returns `self` for chaining.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Appends a header. Invalid header names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) =
            (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
        {
            self.headers.append(name, value);
        }
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The path split on `/`, each segment percent-decoded.
    ///
    /// Leading and trailing separators are dropped, so `/users/` and
    /// `//users` both give `["users"]` and the root gives nothing. Splitting
    /// happens before decoding: `%2F` stays inside its segment. Invalid
    /// UTF-8 after decoding is replaced with U+FFFD.
    pub fn path_segments(&self) -> Vec<String> {
        let trimmed = self.path().trim_matches('/');
        if trimmed.is_empty() {
            return Vec::new();
        }
        trimmed
            .split('/')
            .map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned())
            .collect()
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: body.into(),
            params: Params::default(),
            extensions: parts.extensions,
        }
    }
}
