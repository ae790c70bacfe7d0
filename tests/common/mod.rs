//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use proxier::config::{ProxierConfig, ProxyRule};
use proxier::ProxyServer;

/// What a mock backend received.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// What a mock backend answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start a programmable raw-TCP backend. One request per connection.
pub async fn start_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(Captured) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut socket).await else {
                    return;
                };
                let reply = respond(captured);
                tokio::time::sleep(reply.delay).await;
                let _ = socket.write_all(render(&reply).as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Backend that answers with the request target it saw, plus echo headers.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(echo).await
}

/// Echo backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(move |req| echo(req).delayed(delay)).await
}

fn echo(req: Captured) -> Reply {
    let header = |name: &str| req.headers.get(name).cloned().unwrap_or_default();
    Reply::ok(req.target.clone())
        .header("x-echo-method", &req.method)
        .header("x-echo-host", &header("host"))
        .header("x-echo-forwarded-for", &header("x-forwarded-for"))
        .header("x-echo-body", &String::from_utf8_lossy(&req.body))
}

fn render(reply: &Reply) -> String {
    let reason = StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let mut out = format!("HTTP/1.1 {} {}\r\n", reply.status, reason);
    for (name, value) in &reply.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.body.len(),
        reply.body
    ));
    out
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < len {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Captured {
        method,
        target,
        headers,
        body,
    })
}

/// An address nothing listens on.
pub fn unused_addr() -> SocketAddr {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
}

/// Loopback config on an ephemeral port.
pub fn config(pooled: bool, rules: &[(&str, String)]) -> ProxierConfig {
    let mut config = ProxierConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.listen_port = 0;
    config.server.pooled = pooled;
    config.timeouts.write_secs = 5;
    config.timeouts.connect_secs = 2;
    config.proxy = rules
        .iter()
        .map(|(endpoint, destination)| ProxyRule::new(*endpoint, destination.clone()))
        .collect();
    config
}

/// Start a proxy and return it with its base URL.
pub fn start_proxy(config: &ProxierConfig) -> (ProxyServer, String) {
    let mut server = ProxyServer::new(config, tracing::info_span!("test-proxy")).unwrap();
    server.start();
    let addr = server.local_addr().unwrap();
    (server, format!("http://{addr}"))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub async fn get_text(client: &reqwest::Client, url: &str) -> (u16, String) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

/// Run `f` once per engine.
pub async fn for_each_engine<F, Fut>(f: F)
where
    F: Fn(bool) -> Fut,
    Fut: Future<Output = ()>,
{
    for pooled in [false, true] {
        f(pooled).await;
    }
}
