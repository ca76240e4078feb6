//! Minimal flow example: a RESTful `users` resource, one named route and the
//! default middleware stack.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!   curl http://localhost:3000/about

use std::collections::HashMap;
use std::time::Duration;

use flow::middleware;
use flow::{App, Request, Resource, Response, Router};
use http::StatusCode;
use serde::Serialize;

#[derive(Serialize)]
struct User<'a> {
    id: &'a str,
    name: &'a str,
}

struct Users;

impl Resource for Users {
    async fn index(&self, _req: Request) -> Response {
        Response::to_json(&[User { id: "42", name: "alice" }])
    }

    async fn new(&self, _req: Request) -> Response {
        Response::html("<form method=post action=/users></form>")
    }

    async fn create(&self, req: Request) -> Response {
        if req.body().is_empty() {
            return Response::status(StatusCode::BAD_REQUEST);
        }
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(r#"{"id":"99","name":"new_user"}"#)
    }

    async fn show(&self, req: Request) -> Response {
        let id = req.param("id").unwrap_or("unknown");
        Response::to_json(&User { id, name: "alice" })
    }

    async fn edit(&self, req: Request) -> Response {
        Response::html(format!("<form>editing {}</form>", req.param("id").unwrap_or_default()))
    }

    async fn update(&self, _req: Request) -> Response {
        Response::status(StatusCode::NO_CONTENT)
    }

    async fn destroy(&self, _req: Request) -> Response {
        Response::status(StatusCode::NO_CONTENT)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let router = Router::new()
        .resources("users", Users)?
        .handle_named("about", http::Method::GET, "/about", |_req: Request| async {
            "flow basic example"
        });

    let profile = router.url("users_show", &HashMap::from([("id", "42")]))?;
    tracing::info!(%profile, "example link");

    let app = flow::default_middleware()
        .into_iter()
        .fold(App::new("basic").router(router), App::use_middleware)
        .use_middleware(middleware::timeout(Duration::from_secs(5)))
        .addr("0.0.0.0:3000");

    app.serve().await?;
    Ok(())
}
