//! Per-request tracing.

use std::time::Instant;

use tracing::{debug, info};

use super::{from_fn, Middleware};

/// Logs every request at `debug` on the way in and at `info` on the way out,
/// with method, path, status and latency as structured fields.
pub fn trace() -> Middleware {
    from_fn(|req, next| async move {
        let method = req.method().clone();
        let path = req.path().to_owned();
        let start = Instant::now();
        debug!(%method, %path, "request start");

        let res = next.run(req).await;

        info!(
            %method,
            %path,
            status = res.status_code().as_u16(),
            latency_us = start.elapsed().as_micros() as u64,
            "request complete"
        );
        res
    })
}
