//! Standard engine.
//!
//! # Responsibilities
//! - Build the axum Router around the shared dispatcher
//! - Wire up middleware (tracing, request ID)
//! - Serve HTTP/1.1 and HTTP/2 on each accepted connection

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use futures_util::future::{BoxFuture, FutureExt};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::Watcher;
use tokio::net::TcpStream;
use tower::ServiceExt;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::{Engine, EngineKind};
use crate::net::connection::PeerAddr;
use crate::routing::Dispatcher;

/// Engine backed by axum and the hyper auto connection builder.
pub struct StandardEngine {
    router: Router,
    read_timeout: Duration,
}

impl StandardEngine {
    pub fn new(dispatcher: Arc<Dispatcher>, read_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(dispatcher),
            read_timeout,
        }
    }

    /// Every path goes through the dispatcher, reserved ones included.
    fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(dispatcher)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }
}

impl Engine for StandardEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Standard
    }

    fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        watcher: Watcher,
    ) -> BoxFuture<'static, ()> {
        let router = self.router.clone();
        let read_timeout = self.read_timeout;

        async move {
            // Called once per request on the connection.
            let svc = service_fn(move |mut req: Request<Incoming>| {
                req.extensions_mut().insert(PeerAddr(peer));
                router.clone().oneshot(req)
            });

            let mut builder = ConnBuilder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(read_timeout);

            let conn = builder.serve_connection(TokioIo::new(stream), svc);
            if let Err(e) = watcher.watch(conn).await {
                tracing::debug!(peer = %peer, "connection error: {e}");
            }
        }
        .boxed()
    }
}

async fn proxy_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.dispatch(request).await
}
