//! Connection server tests over real sockets.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use image_relay::config::RelayConfig;
use image_relay::lifecycle::Shutdown;
use image_relay::net::Listener;
use image_relay::relay::RelayHandler;
use image_relay::RelayServer;

mod common;
use common::{image, start_upstream, status, Reply};

async fn start_relay(server: RelayServer, shutdown: &Shutdown) -> (SocketAddr, JoinHandle<()>) {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, 64);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, handle)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn serves_images_over_http() {
    let upstream = start_upstream(|target| match target {
        "/u/logo.png" => image("image/png", b"\x89PNG\r\n\x1a\n"),
        _ => status("404 Not Found"),
    })
    .await;
    let shutdown = Shutdown::new();
    let (addr, _server) = start_relay(RelayServer::new(&upstream.config()), &shutdown).await;

    let res = http_client()
        .get(format!("http://{addr}/logo"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let headers = res.headers();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["cache-control"], "public, max-age=3600");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(res.bytes().await.unwrap().as_ref(), b"\x89PNG\r\n\x1a\n");

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_asset_is_404_with_empty_body() {
    let upstream = start_upstream(|_| status("404 Not Found")).await;
    let shutdown = Shutdown::new();
    let (addr, _server) = start_relay(RelayServer::new(&upstream.config()), &shutdown).await;

    let res = http_client()
        .get(format!("http://{addr}/nothing-here"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    assert!(res.bytes().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn raw_request_gets_closed_after_response() {
    let upstream = start_upstream(|_| image("image/webp", b"RIFF")).await;
    let shutdown = Shutdown::new();
    let (addr, _server) = start_relay(RelayServer::new(&upstream.config()), &shutdown).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /x HTTP/1.0\r\n\r\n")
        .await
        .unwrap();
    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .expect("relay did not close the connection")
        .unwrap();

    let (head, body) = common::split_response(&raw);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(common::header(&head, "connection"), Some("close"));
    assert_eq!(body, b"RIFF");

    shutdown.trigger();
}

#[tokio::test]
async fn slow_request_does_not_block_others() {
    let upstream = start_upstream(|target| match target {
        t if t.starts_with("/u/slow") => Reply::Stall,
        _ => image("image/png", b"fast"),
    })
    .await;
    let config = upstream.config();
    let handler = RelayHandler::with_deadlines(&config, common::fast_deadlines());
    let shutdown = Shutdown::new();
    let (addr, _server) = start_relay(
        RelayServer::with_handler(handler, Duration::from_secs(5)),
        &shutdown,
    )
    .await;

    let client = http_client();
    let slow = tokio::spawn({
        let client = client.clone();
        async move { client.get(format!("http://{addr}/slow")).send().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fast = client.get(format!("http://{addr}/quick")).send().await.unwrap();
    assert_eq!(fast.status().as_u16(), 200);
    assert!(!slow.is_finished());

    // Three stalled candidates, each cut off by the read deadline.
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.status().as_u16(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting_and_returns() {
    let upstream = start_upstream(|_| image("image/png", b"x")).await;
    let shutdown = Shutdown::new();
    let server = RelayServer::new(&upstream.config());
    let tracker = server.tracker().clone();
    let (addr, handle) = start_relay(server, &shutdown).await;

    let res = http_client()
        .get(format!("http://{addr}/one"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    res.bytes().await.unwrap();

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert_eq!(tracker.active_count(), 0);

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn default_config_server_builds() {
    let config = RelayConfig::default();
    let server = RelayServer::new(&config);
    assert_eq!(server.tracker().active_count(), 0);
}
