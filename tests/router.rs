use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flow::middleware::{self, Middleware, Next};
use flow::router::UrlError;
use flow::{Request, Resource, Response, Router};
use http::{Method, StatusCode};

async fn get(router: &Router, path: &str) -> Response {
    router.dispatch(Request::new(Method::GET, path)).await
}

fn body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

#[tokio::test]
async fn multiple_params_reach_the_handler() {
    let router = Router::new().get("/posts/:post_id/comments/:id", |req: Request| async move {
        format!("{}:{}", req.param("post_id").unwrap(), req.param("id").unwrap())
    });

    let res = get(&router, "/posts/12/comments/3").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "12:3");
}

#[tokio::test]
async fn trailing_slash_is_ignored() {
    let router = Router::new().get("/users/:id", |req: Request| async move {
        req.param("id").unwrap().to_owned()
    });

    assert_eq!(body(&get(&router, "/users/7/").await), "7");
    assert_eq!(body(&get(&router, "/users/7").await), "7");
}

#[tokio::test]
async fn wrong_method_is_405_and_unknown_path_is_404() {
    let router = Router::new().post("/users", |_req: Request| async { "created" });

    assert_eq!(get(&router, "/users").await.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(get(&router, "/posts").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(get(&router, "/users/1").await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn route_middleware_runs_before_the_handler() {
    let trail = Arc::new(Mutex::new(String::new()));

    let mark: Middleware = {
        let trail = Arc::clone(&trail);
        middleware::from_fn(move |req: Request, next: Next| {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().unwrap().push('m');
                next.run(req).await
            }
        })
    };
    let handler = {
        let trail = Arc::clone(&trail);
        move |_req: Request| {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().unwrap().push('h');
                "done"
            }
        }
    };

    let router = Router::new()
        .handle_with(Method::GET, "/guarded", handler, [mark])
        .get("/open", |_req: Request| async { "open" });

    get(&router, "/guarded").await;
    assert_eq!(*trail.lock().unwrap(), "mh");

    get(&router, "/open").await;
    assert_eq!(*trail.lock().unwrap(), "mh");
}

#[test]
fn url_for_named_routes() {
    let router = Router::new()
        .handle_named("home", Method::GET, "/", |_req: Request| async { "home" })
        .handle_named("file", Method::GET, "/files/:name", |_req: Request| async { "f" });

    let none: HashMap<&str, &str> = HashMap::new();
    assert_eq!(router.url("home", &none).unwrap(), "/");
    assert_eq!(
        router.url("file", &HashMap::from([("name", "a b/c")])).unwrap(),
        "/files/a%20b%2Fc"
    );
    assert_eq!(
        router.url("file", &none),
        Err(UrlError::MissingParam { route: "file".into(), param: "name".into() })
    );
    assert_eq!(router.url("nope", &none), Err(UrlError::UnknownRoute("nope".into())));
}

#[tokio::test]
async fn escaped_params_round_trip_through_dispatch() {
    let router = Router::new().handle_named("file", Method::GET, "/files/:name", |req: Request| async move {
        req.param("name").unwrap().to_owned()
    });

    for name in ["a b", "a/b", "café", "100%"] {
        let href = router.url("file", &HashMap::from([("name", name)])).unwrap();
        let res = get(&router, &href).await;
        assert_eq!(res.status_code(), StatusCode::OK, "{href}");
        assert_eq!(body(&res), name, "{href}");
    }
}

#[tokio::test]
async fn non_ascii_literals_match_encoded_requests() {
    let router = Router::new().get("/café", |_req: Request| async { "menu" });

    let res = get(&router, "/caf%C3%A9").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body(&res), "menu");
}

#[tokio::test]
async fn repeated_outer_slashes_are_trimmed() {
    let router = Router::new().get("/users", |_req: Request| async { "users" });

    for path in ["/users//", "//users", "/users/"] {
        assert_eq!(body(&get(&router, path).await), "users", "{path}");
    }
}

struct Users;

impl Resource for Users {
    async fn index(&self, _req: Request) -> Response { Response::text("index") }
    async fn new(&self, _req: Request) -> Response { Response::text("new") }
    async fn create(&self, _req: Request) -> Response { Response::status(StatusCode::CREATED) }
    async fn show(&self, req: Request) -> Response {
        Response::text(format!("show {}", req.param("id").unwrap_or_default()))
    }
    async fn edit(&self, _req: Request) -> Response { Response::text("edit") }
    async fn update(&self, _req: Request) -> Response { Response::text("update") }
    async fn destroy(&self, _req: Request) -> Response { Response::status(StatusCode::NO_CONTENT) }
}

#[tokio::test]
async fn resources_register_eight_routes() {
    let router = Router::new().resources("users", Users).unwrap();
    assert_eq!(router.routes().count(), 8);
    assert_eq!(router.routes().filter(|r| r.name.is_some()).count(), 7);

    assert_eq!(router.url("users_show", &HashMap::from([("id", "7")])).unwrap(), "/users/7");
    assert_eq!(body(&get(&router, "/users/7").await), "show 7");
    assert_eq!(body(&get(&router, "/users/new").await), "new");

    let res = router.dispatch(Request::new(Method::DELETE, "/users/7")).await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
}
