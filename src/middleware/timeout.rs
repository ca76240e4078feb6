//! Per-request deadlines.
//!
//! The framework never preempts a handler. [`timeout`] stores a [`Deadline`]
//! that handlers can observe cooperatively, and races the rest of the chain
//! against it at this layer: whichever finishes first produces the response.
//! A handler that loses the race is dropped at its next `.await`.

use std::time::Duration;

use http::StatusCode;
use tokio::time::Instant;
use tracing::warn;

use super::{from_fn, Middleware};
use crate::response::Response;

/// When the in-flight request must be finished, readable from
/// [`Request::extensions`](crate::Request::extensions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(pub Instant);

impl Deadline {
    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Resolves when the deadline passes.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.0).await;
    }
}

/// Bounds each request to `limit`. Expiry answers `503 Service Unavailable`.
/// A zero `limit` disables the layer.
pub fn timeout(limit: Duration) -> Middleware {
    from_fn(move |mut req, next| async move {
        if limit.is_zero() {
            return next.run(req).await;
        }

        let deadline = Instant::now() + limit;
        req.extensions_mut().insert(Deadline(deadline));
        let path = req.path().to_owned();

        match tokio::time::timeout_at(deadline, next.run(req)).await {
            Ok(res) => res,
            Err(_) => {
                warn!(%path, limit_ms = limit.as_millis() as u64, "request timed out");
                Response::error(StatusCode::SERVICE_UNAVAILABLE)
            }
        }
    })
}
