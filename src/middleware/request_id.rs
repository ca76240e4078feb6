//! Request-id propagation.

use http::header::HeaderName;
use http::HeaderValue;
use uuid::Uuid;

use super::{from_fn, Middleware};

/// Header used when [`request_id`] is given an empty name.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// The id assigned to the in-flight request, readable from
/// [`Request::extensions`](crate::Request::extensions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Ensures every request carries an id in `header`.
///
/// An incoming non-empty id is kept; otherwise a UUID v4 is generated. The id
/// is written back onto the request headers, stored as a [`RequestId`]
/// extension and echoed on the response.
///
/// # Panics
///
/// Panics if `header` is not a valid header name.
pub fn request_id(header: &str) -> Middleware {
    let header = if header.is_empty() { DEFAULT_REQUEST_ID_HEADER } else { header };
    let name = HeaderName::from_bytes(header.as_bytes())
        .unwrap_or_else(|e| panic!("middleware: invalid request-id header `{header}`: {e}"));

    from_fn(move |mut req, next| {
        let name = name.clone();
        async move {
            let id = match req.header(name.as_str()) {
                Some(id) if !id.is_empty() => id.to_owned(),
                _ => Uuid::new_v4().to_string(),
            };
            let value = HeaderValue::from_str(&id).ok();
            if let Some(value) = &value {
                req.headers_mut().insert(name.clone(), value.clone());
            }
            req.extensions_mut().insert(RequestId(id));

            let mut res = next.run(req).await;
            if let Some(value) = value {
                res.headers_mut().insert(name, value);
            }
            res
        }
    })
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::compose;
    use crate::{Request, Response};

    fn echo_id() -> crate::handler::BoxedHandler {
        (|req: Request| async move {
            let from_ext = req.extensions().get::<RequestId>().map(|id| id.0.clone());
            let from_header = req.header(DEFAULT_REQUEST_ID_HEADER).map(str::to_owned);
            assert_eq!(from_ext, from_header);
            Response::text(from_ext.unwrap_or_default())
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn generates_an_id_when_missing() {
        let chain = compose(&[request_id("")], echo_id());
        let res = chain.call(Request::new(Method::GET, "/")).await;

        let header = res.header(DEFAULT_REQUEST_ID_HEADER).unwrap().to_owned();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(res.body().as_ref(), header.as_bytes());
    }

    #[tokio::test]
    async fn keeps_an_incoming_id() {
        let chain = compose(&[request_id("X-Request-ID")], echo_id());
        let req = Request::new(Method::GET, "/").with_header("x-request-id", "abc-123");
        let res = chain.call(req).await;

        assert_eq!(res.header("x-request-id"), Some("abc-123"));
        assert_eq!(res.body().as_ref(), b"abc-123");
    }
}
