//! RESTful resource wiring.

use std::future::Future;
use std::sync::Arc;

use http::Method;

use super::{ResourceError, Router};
use crate::request::Request;
use crate::response::Response;

/// The seven conventional actions of a resource controller.
///
/// Implement it with plain `async fn`s; [`Router::resources`] wires the
/// controller to eight routes under one base path. The router only ever
/// sees this trait, never the concrete controller.
///
/// ```rust
/// use flow::{Request, Resource, Response, Router};
///
/// struct Users;
///
/// impl Resource for Users {
///     async fn index(&self, _req: Request) -> Response { Response::text("all users") }
///     async fn new(&self, _req: Request) -> Response { Response::text("form") }
///     async fn create(&self, _req: Request) -> Response { Response::redirect("/users") }
///     async fn show(&self, req: Request) -> Response {
///         Response::text(format!("user {}", req.param("id").unwrap_or_default()))
///     }
///     async fn edit(&self, _req: Request) -> Response { Response::text("edit form") }
///     async fn update(&self, _req: Request) -> Response { Response::text("updated") }
///     async fn destroy(&self, _req: Request) -> Response { Response::text("gone") }
/// }
///
/// let router = Router::new().resources("users", Users).unwrap();
/// assert_eq!(router.routes().count(), 8);
/// ```
pub trait Resource: Send + Sync + 'static {
    fn index(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn new(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn create(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn show(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn edit(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn update(&self, req: Request) -> impl Future<Output = Response> + Send;
    fn destroy(&self, req: Request) -> impl Future<Output = Response> + Send;
}

/// Adapts one controller action into a route handler sharing the controller.
macro_rules! action {
    ($ctrl:expr, $action:ident) => {{
        let ctrl = Arc::clone(&$ctrl);
        move |req: Request| {
            let ctrl = Arc::clone(&ctrl);
            async move { ctrl.$action(req).await }
        }
    }};
}

impl Router {
    /// Registers the conventional RESTful routes for `controller` under
    /// `base`, in this order:
    ///
    /// | Verb   | Path              | Action    | Name               |
    /// |--------|-------------------|-----------|--------------------|
    /// | GET    | `/{base}`         | `index`   | `{base}_index`     |
    /// | GET    | `/{base}/new`     | `new`     | `{base}_new`       |
    /// | POST   | `/{base}`         | `create`  | `{base}_create`    |
    /// | GET    | `/{base}/:id`     | `show`    | `{base}_show`      |
    /// | GET    | `/{base}/:id/edit`| `edit`    | `{base}_edit`      |
    /// | PUT    | `/{base}/:id`     | `update`  | `{base}_update`    |
    /// | PATCH  | `/{base}/:id`     | `update`  | (unnamed)          |
    /// | DELETE | `/{base}/:id`     | `destroy` | `{base}_destroy`   |
    ///
    /// Leading and trailing `/` are trimmed from `base`; any inner `/`
    /// becomes `_` in the route names, so `admin/users` gives `admin_users_show`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::EmptyBase`] if `base` is empty after trimming.
    ///
    /// # Panics
    ///
    /// Like every named registration, if one of the names is already taken.
    pub fn resources<C: Resource>(self, base: &str, controller: C) -> Result<Self, ResourceError> {
        let base = base.trim_matches('/');
        if base.is_empty() {
            return Err(ResourceError::EmptyBase);
        }

        let ctrl = Arc::new(controller);
        let prefix = base.replace('/', "_");
        let name = |action: &str| format!("{prefix}_{action}");
        let collection = format!("/{base}");
        let member = format!("/{base}/:id");

        Ok(self
            .handle_named(&name("index"), Method::GET, &collection, action!(ctrl, index))
            .handle_named(&name("new"), Method::GET, &format!("/{base}/new"), action!(ctrl, new))
            .handle_named(&name("create"), Method::POST, &collection, action!(ctrl, create))
            .handle_named(&name("show"), Method::GET, &member, action!(ctrl, show))
            .handle_named(&name("edit"), Method::GET, &format!("/{base}/:id/edit"), action!(ctrl, edit))
            .handle_named(&name("update"), Method::PUT, &member, action!(ctrl, update))
            .handle(Method::PATCH, &member, action!(ctrl, update))
            .handle_named(&name("destroy"), Method::DELETE, &member, action!(ctrl, destroy)))
    }
}
