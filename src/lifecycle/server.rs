//! Proxy server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper_util::server::graceful::GracefulShutdown;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, Span};

use crate::config::ProxierConfig;
use crate::error::ProxierError;
use crate::http::{build_engine, Engine, EngineKind};
use crate::lifecycle::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::proxy::{build_routes, Upstream, UpstreamSettings};
use crate::routing::Dispatcher;

/// Fatal server errors, delivered through [`ProxyServer::notify`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{engine} engine failed to start: {source}")]
    Bind {
        engine: EngineKind,
        #[source]
        source: ListenerError,
    },

    #[error("{engine} engine stopped accepting: {source}")]
    Listener {
        engine: EngineKind,
        #[source]
        source: ListenerError,
    },
}

#[derive(Debug)]
enum State {
    Created,
    Started(JoinHandle<()>),
    Stopped,
}

/// A configured proxy bound to one engine.
pub struct ProxyServer {
    engine: Arc<dyn Engine>,
    address: String,
    max_connections: usize,
    span: Span,
    state: State,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    local_addr: Option<SocketAddr>,
    errors_tx: mpsc::Sender<ServerError>,
    errors_rx: mpsc::Receiver<ServerError>,
}

impl ProxyServer {
    /// Build the route table and the engine selected by `server.pooled`.
    ///
    /// Every event the server emits is recorded under `span`. Nothing is
    /// bound until [`start`](Self::start).
    pub fn new(config: &ProxierConfig, span: Span) -> Result<Self, ProxierError> {
        span.in_scope(|| -> Result<Self, ProxierError> {
            let kind = EngineKind::from_pooled_flag(config.server.pooled);
            let mut upstream = Upstream::new(kind, UpstreamSettings::from_config(config))?;
            let routes = build_routes(&config.proxy, &mut upstream)?;
            let route_count = routes.len();

            let dispatcher = Arc::new(Dispatcher::new(routes, kind));
            let engine = build_engine(
                kind,
                dispatcher,
                Duration::from_secs(config.timeouts.read_secs),
            );
            let (errors_tx, errors_rx) = mpsc::channel(1);

            tracing::info!(
                engine = %kind,
                routes = route_count,
                upstream_clients = upstream.client_count(),
                address = %config.server.address(),
                "Proxy server configured"
            );

            Ok(Self {
                engine,
                address: config.server.address(),
                max_connections: config.server.max_connections,
                span: span.clone(),
                state: State::Created,
                shutdown: Shutdown::new(),
                tracker: ConnectionTracker::new(),
                local_addr: None,
                errors_tx,
                errors_rx,
            })
        })
    }

    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Live inbound connections.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Bind and begin serving in the background.
    ///
    /// Returns immediately. A bind failure is not returned; it is delivered
    /// through [`notify`](Self::notify) and the server moves to stopped.
    /// Calling `start` twice, or after `stop`, is ignored.
    pub fn start(&mut self) {
        let span = self.span.clone();
        let _entered = span.enter();

        match self.state {
            State::Created => {}
            State::Started(_) => {
                tracing::warn!("Server already started");
                return;
            }
            State::Stopped => {
                tracing::warn!("Server already stopped; restart is not supported");
                return;
            }
        }

        let engine = self.engine.kind();
        let listener = match Listener::bind(&self.address, self.max_connections) {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(engine = %engine, error = %source, "Failed to start server");
                // Capacity one: only the first fatal error is kept.
                let _ = self.errors_tx.try_send(ServerError::Bind { engine, source });
                self.state = State::Stopped;
                return;
            }
        };

        self.local_addr = listener.local_addr().ok();
        tracing::info!(
            engine = %engine,
            address = ?self.local_addr,
            "Server started"
        );

        let task = tokio::spawn(
            accept_loop(
                listener,
                Arc::clone(&self.engine),
                self.shutdown.subscribe(),
                self.tracker.clone(),
                self.errors_tx.clone(),
            )
            .instrument(span.clone()),
        );
        self.state = State::Started(task);
    }

    /// Fatal server errors. Only the first one is guaranteed to be kept.
    pub fn notify(&mut self) -> &mut mpsc::Receiver<ServerError> {
        &mut self.errors_rx
    }

    /// Stop accepting and drain live connections.
    ///
    /// In-flight requests may finish until `deadline`; whatever is still open
    /// then is closed. Stopping twice is a no-op.
    pub async fn stop(&mut self, deadline: Duration) {
        let span = self.span.clone();
        async {
            match std::mem::replace(&mut self.state, State::Stopped) {
                State::Created => {
                    tracing::warn!("Stop called before start");
                }
                State::Stopped => {
                    tracing::debug!("Server already stopped");
                }
                State::Started(mut task) => {
                    tracing::info!(deadline = ?deadline, "Stopping server");
                    self.shutdown.trigger();

                    match tokio::time::timeout(deadline, &mut task).await {
                        Ok(Ok(())) => tracing::info!("Server stopped gracefully"),
                        Ok(Err(e)) => tracing::error!(error = %e, "Accept loop failed"),
                        Err(_) => {
                            let remaining = self.tracker.active_count();
                            // Dropping the task drops its connection set,
                            // which aborts every connection still open.
                            task.abort();
                            let _ = task.await;
                            tracing::warn!(
                                remaining,
                                "Shutdown deadline reached, connections force-closed"
                            );
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

async fn accept_loop(
    listener: Listener,
    engine: Arc<dyn Engine>,
    mut shutdown: broadcast::Receiver<()>,
    tracker: ConnectionTracker,
    errors: mpsc::Sender<ServerError>,
) {
    let graceful = GracefulShutdown::new();
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => break,

            Some(_) = connections.join_next(), if !connections.is_empty() => {}

            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    let guard = tracker.track();
                    let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);
                    let conn = engine.serve_connection(stream, peer, graceful.watcher());

                    connections.spawn(
                        async move {
                            let _permit = permit;
                            let _guard = guard;
                            conn.await;
                        }
                        .instrument(span),
                    );
                }
                Err(source @ ListenerError::Closed) => {
                    tracing::error!(error = %source, "Listener closed unexpectedly");
                    let _ = errors.try_send(ServerError::Listener { engine: engine.kind(), source });
                    break;
                }
                Err(e) => {
                    // Usually fd exhaustion; back off instead of spinning.
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
        }
    }

    drop(listener);
    tracing::info!(
        active = tracker.active_count(),
        "Listener closed, draining connections"
    );

    graceful.shutdown().await;
    while connections.join_next().await.is_some() {}

    tracing::info!("All connections drained");
}
