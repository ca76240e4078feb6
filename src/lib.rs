//! # flow
//!
//! A minimal web-application framework: path routing with named routes and
//! RESTful resources, composable middleware, and a SQL migration runner.
//!
//! - [`Router`] matches `/users/:id`-style patterns segment by segment,
//!   answers 405 when only the method is wrong, and builds URLs back from
//!   route names.
//! - [`middleware`] wraps handlers; the first registered layer is the
//!   outermost.
//! - [`App`] bundles a router with global middleware and serves it over
//!   HTTP/1.1 and HTTP/2 with graceful shutdown.
//! - [`migrate`] applies and rolls back timestamped `.up.sql`/`.down.sql`
//!   pairs against SQLite, recording them in a `flow_migrations` table.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use flow::{middleware, App, Request, Response, Router};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flow::Error> {
//!     let router = Router::new()
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user);
//!
//!     App::new("users")
//!         .router(router)
//!         .use_middleware(middleware::recover())
//!         .use_middleware(middleware::trace())
//!         .serve()
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(req.body().clone())
//! }
//! ```

mod app;
mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod middleware;
pub mod migrate;
pub mod router;

pub use app::{default_middleware, App, DEFAULT_ADDR};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use migrate::{MigrateError, Migrator};
pub use request::{Params, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Resource, Router};
pub use server::{shutdown_signal, Server, DEFAULT_SHUTDOWN_TIMEOUT};
