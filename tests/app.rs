use std::time::Duration;

use flow::{middleware, App, Request, Response, Router, Server};
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

fn demo() -> App {
    let router = Router::new()
        .get("/", |_req: Request| async { Response::text("Flow app running") })
        .get("/health", |_req: Request| async { Response::json(r#"{"status":"ok"}"#) })
        .post("/echo", |req: Request| async move { Response::text(String::from_utf8_lossy(req.body()).into_owned()) })
        .get("/slow", |_req: Request| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "slow"
        });

    flow::default_middleware().into_iter().fold(App::new("demo").router(router), App::use_middleware)
}

/// Sends one HTTP/1.1 request with `Connection: close` and returns the raw
/// response text.
async fn roundtrip(addr: std::net::SocketAddr, head: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{head} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn dispatch_without_a_socket() {
    let app = demo();

    let res = app.dispatch(Request::new(http::Method::GET, "/health")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.body().as_ref(), br#"{"status":"ok"}"#);
    assert!(res.header("x-request-id").is_some());
    assert!(res.header("x-response-time").unwrap().ends_with("ms"));

    let res = app.dispatch(Request::new(http::Method::DELETE, "/health")).await;
    assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn serves_over_tcp_and_stops_on_signal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(
        Server::from_listener(listener).serve_with_shutdown(demo(), async move {
            let _ = stopped.await;
        }),
    );

    let res = roundtrip(addr, "GET /", "").await;
    assert!(res.starts_with("HTTP/1.1 200"), "{res}");
    assert!(res.ends_with("Flow app running"), "{res}");

    let res = roundtrip(addr, "POST /echo", "hello body").await;
    assert!(res.ends_with("hello body"), "{res}");

    let res = roundtrip(addr, "GET /missing", "").await;
    assert!(res.starts_with("HTTP/1.1 404"), "{res}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn in_flight_request_finishes_during_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(
        Server::from_listener(listener).serve_with_shutdown(demo(), async move {
            let _ = stopped.await;
        }),
    );

    let slow = tokio::spawn(roundtrip(addr, "GET /slow", ""));
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.send(()).unwrap();

    let res = slow.await.unwrap();
    assert!(res.starts_with("HTTP/1.1 200"), "{res}");
    assert!(res.ends_with("slow"), "{res}");
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn drain_is_bounded_by_the_shutdown_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let router = Router::new().get("/stuck", |_req: Request| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        "never"
    });
    let app = App::new("stuck").router(router).use_middleware(middleware::trace());

    let server = tokio::spawn(
        Server::from_listener(listener)
            .shutdown_timeout(Duration::from_millis(100))
            .serve_with_shutdown(app, async move {
                let _ = stopped.await;
            }),
    );

    let _client = tokio::spawn(roundtrip(addr, "GET /stuck", ""));
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.send(()).unwrap();

    let err = server.await.unwrap().unwrap_err();
    assert!(matches!(err, flow::Error::ShutdownTimeout { in_flight: 1 }));
}
