//! Pooled engine.
//!
//! Bare hyper HTTP/1.1 connections with no middleware stack. Each request goes
//! straight from `service_fn` to the dispatcher; the forwarders bound for this
//! engine reuse one upstream client per destination.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::{BoxFuture, FutureExt};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::Watcher;
use tokio::net::TcpStream;

use crate::http::{Engine, EngineKind};
use crate::net::connection::PeerAddr;
use crate::routing::Dispatcher;

pub struct PooledEngine {
    dispatcher: Arc<Dispatcher>,
    http: http1::Builder,
}

impl PooledEngine {
    pub fn new(dispatcher: Arc<Dispatcher>, read_timeout: Duration) -> Self {
        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(read_timeout)
            .keep_alive(true);

        Self { dispatcher, http }
    }
}

impl Engine for PooledEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Pooled
    }

    fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        watcher: Watcher,
    ) -> BoxFuture<'static, ()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let svc = service_fn(move |req: Request<Incoming>| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                let mut req = req.map(Body::new);
                req.extensions_mut().insert(PeerAddr(peer));
                Ok::<_, Infallible>(dispatcher.dispatch(req).await)
            }
        });

        let conn = self.http.serve_connection(TokioIo::new(stream), svc);
        async move {
            if let Err(e) = watcher.watch(conn).await {
                tracing::debug!(peer = %peer, "connection error: {e}");
            }
        }
        .boxed()
    }
}
