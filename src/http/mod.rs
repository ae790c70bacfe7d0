//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection (lifecycle accept loop)
//!     → Engine::serve_connection
//!         standard: hyper auto (HTTP/1.1 + HTTP/2) → axum Router + tower-http layers
//!         pooled:   hyper HTTP/1.1, bare service_fn
//!     → routing::Dispatcher
//!     → response.rs (synthesized responses)
//! ```
//!
//! # Design Decisions
//! - Both engines share one dispatcher, so routing semantics are identical
//! - Connections are registered with a graceful-shutdown watcher owned by the
//!   accept loop; the engines never decide when to stop

pub mod pooled;
pub mod response;
pub mod server;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use hyper_util::server::graceful::Watcher;
use tokio::net::TcpStream;

use crate::routing::Dispatcher;

pub use pooled::PooledEngine;
pub use server::StandardEngine;

/// Which I/O engine serves inbound connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Standard,
    Pooled,
}

impl EngineKind {
    pub fn from_pooled_flag(pooled: bool) -> Self {
        if pooled {
            Self::Pooled
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Pooled => "pooled",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serves HTTP on accepted connections.
pub trait Engine: Send + Sync + 'static {
    fn kind(&self) -> EngineKind;

    /// Drive one connection to completion. The returned future must hand the
    /// connection to `watcher` so the accept loop can shut it down gracefully.
    fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        watcher: Watcher,
    ) -> BoxFuture<'static, ()>;
}

/// Build the engine selected by `kind` around a shared dispatcher.
pub fn build_engine(kind: EngineKind, dispatcher: Arc<Dispatcher>, read_timeout: Duration) -> Arc<dyn Engine> {
    match kind {
        EngineKind::Standard => Arc::new(StandardEngine::new(dispatcher, read_timeout)),
        EngineKind::Pooled => Arc::new(PooledEngine::new(dispatcher, read_timeout)),
    }
}
