//! `x-response-time` header.

use std::time::Instant;

use http::HeaderValue;

use super::{from_fn, Middleware};

pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Sets `x-response-time: <n>ms` on every response, measured around the rest
/// of the chain.
pub fn response_time() -> Middleware {
    from_fn(|req, next| async move {
        let start = Instant::now();
        let mut res = next.run(req).await;
        let elapsed = format!("{}ms", start.elapsed().as_millis());
        if let Ok(value) = HeaderValue::from_str(&elapsed) {
            res.headers_mut().insert(RESPONSE_TIME_HEADER, value);
        }
        res
    })
}
