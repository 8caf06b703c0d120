//! Shared utilities for integration testing: a scriptable content store.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use image_relay::config::RelayConfig;
use image_relay::resilience::Deadlines;

/// What the mock store does with one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write these bytes, then close.
    Raw(Vec<u8>),
    /// Read the request and never answer.
    Stall,
    /// Write these bytes, then hold the connection open without sending more.
    StallAfter(Vec<u8>),
    /// Close without writing anything.
    Hangup,
}

/// One request as seen by the mock store.
#[derive(Debug, Clone)]
pub struct Seen {
    pub target: String,
    pub head: String,
}

/// A running mock store.
pub struct MockUpstream {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockUpstream {
    /// Request targets in arrival order, e.g. `/u/cat.webp`.
    pub fn targets(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.target.clone()).collect()
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// Relay configuration pointing at this store.
    pub fn config(&self) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.upstream.host = self.addr.ip().to_string();
        config.upstream.port = self.addr.port();
        config
    }
}

/// Start a mock store on an ephemeral port. `script` picks the reply for
/// each request target.
pub async fn start_upstream<F>(script: F) -> MockUpstream
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let script = script.clone();
                    let log = log.clone();
                    tokio::spawn(async move { serve_one(socket, script.as_ref(), &log).await });
                }
                Err(_) => break,
            }
        }
    });

    MockUpstream { addr, seen }
}

async fn serve_one<F>(mut socket: TcpStream, script: &F, log: &Mutex<Vec<Seen>>)
where
    F: Fn(&str) -> Reply,
{
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(1) => head.push(byte[0]),
            _ => return,
        }
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let target = head.split(' ').nth(1).unwrap_or_default().to_string();
    let reply = script(&target);
    log.lock().unwrap().push(Seen { target, head });

    match reply {
        Reply::Raw(bytes) => {
            let _ = socket.write_all(&bytes).await;
            let _ = socket.shutdown().await;
        }
        Reply::Stall => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Reply::StallAfter(bytes) => {
            let _ = socket.write_all(&bytes).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Reply::Hangup => {}
    }
}

/// A 200 response carrying `body` as `content_type`.
pub fn image(content_type: &str, body: &[u8]) -> Reply {
    let mut raw = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);
    Reply::Raw(raw)
}

/// An empty response with the given status line.
pub fn status(line: &str) -> Reply {
    let raw = format!("HTTP/1.1 {line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    Reply::Raw(raw.into_bytes())
}

/// Short deadlines so stall tests finish quickly.
pub fn fast_deadlines() -> Deadlines {
    Deadlines {
        connect: Duration::from_millis(500),
        io: Duration::from_millis(300),
    }
}

/// An address on which nothing is listening.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Split a raw HTTP response into its head text and body bytes.
pub fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no head terminator");
    (
        String::from_utf8_lossy(&raw[..end + 4]).into_owned(),
        raw[end + 4..].to_vec(),
    )
}

/// Case-insensitive header lookup on a response head.
pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.split("\r\n").skip(1).find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}
