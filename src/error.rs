//! Unified error type.

use thiserror::Error as ThisError;

/// The error type returned by the server's fallible operations.
///
/// Application-level errors (404, 405, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding to a port or accepting a connection.
///
/// Routing and migration failures have their own types:
/// [`UrlError`](crate::router::UrlError),
/// [`ResourceError`](crate::router::ResourceError) and
/// [`MigrateError`](crate::migrate::MigrateError).
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timed out with {in_flight} connection(s) still open")]
    ShutdownTimeout { in_flight: usize },
}
