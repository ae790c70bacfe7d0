//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (matched route)
//!     → Forwarder::forward
//!         standard: SingleHostProxy, director rewrites the target, bodies stream
//!         pooled:   per-origin client, request buffered, response copied
//!     → Upstream
//! ```
//!
//! # Design Decisions
//! - One forwarder per route, bound at startup from the selected engine
//! - Both variants re-check the endpoint prefix before contacting the upstream
//! - Redirects are never followed; the caller sees them as-is
//! - Upstream failures are contained to the request that hit them

pub mod headers;
pub mod pooled;
pub mod standard;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri};
use futures_util::future::BoxFuture;

use crate::config::{ProxierConfig, ProxyRule};
use crate::http::EngineKind;
use crate::routing::dispatcher::{LIVEZ_PATH, ROOT_PATH};
use crate::routing::{rewrite_path, Destination, RouteTable, RoutingError};

pub use pooled::{ClientRegistry, PooledForwarder};
pub use standard::SingleHostProxy;

/// Forwards requests for one route.
pub trait Forwarder: Send + Sync + 'static {
    /// Never fails: upstream errors are turned into responses.
    fn forward(self: Arc<Self>, req: Request<Body>) -> BoxFuture<'static, Response<Body>>;
}

/// Errors raised while forwarding a single request.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("path {path} is outside endpoint {endpoint}")]
    InvalidEndpoint { path: String, endpoint: String },

    #[error("invalid target URL {url}: {source}")]
    Target {
        url: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::BoxError),

    #[error(transparent)]
    Upstream(#[from] reqwest::Error),
}

/// Where a request is going, computed once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub original_path: String,
    pub endpoint: String,
    pub rewritten_path: String,
    pub target_url: String,
}

impl RequestContext {
    pub fn resolve(uri: &Uri, endpoint: &str, destination: &Destination) -> Result<Self, ForwardError> {
        let original_path = uri.path();
        let rewritten_path = rewrite_path(original_path, endpoint, destination.base_path()).ok_or_else(|| {
            ForwardError::InvalidEndpoint {
                path: original_path.to_string(),
                endpoint: endpoint.to_string(),
            }
        })?;

        Ok(Self {
            original_path: original_path.to_string(),
            endpoint: endpoint.to_string(),
            target_url: destination.target_url(&rewritten_path, uri.query()),
            rewritten_path,
        })
    }

    /// One record per proxied request.
    pub fn log(&self, destination: &Destination) {
        tracing::info!(
            original_path = %self.original_path,
            destination = %destination,
            rewritten_path = %self.rewritten_path,
            "Proxying request"
        );
    }
}

/// Upstream client settings shared by every route.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub connect_timeout: Duration,
    /// Whole exchange: connect, send and receive.
    pub request_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_body_size: usize,
}

impl UpstreamSettings {
    pub fn from_config(config: &ProxierConfig) -> Self {
        let timeouts = &config.timeouts;
        Self {
            connect_timeout: Duration::from_secs(timeouts.connect_secs),
            request_timeout: Duration::from_secs(timeouts.write_secs),
            idle_timeout: Duration::from_secs(timeouts.idle_secs),
            max_body_size: config.server.max_body_size,
        }
    }

    pub fn build_client(&self) -> Result<reqwest::Client, RoutingError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_idle_timeout(self.idle_timeout)
            .build()?;
        Ok(client)
    }
}

/// Binds forwarders of the selected engine.
pub enum Upstream {
    /// One streaming client for every route.
    Standard { client: reqwest::Client },
    /// One buffered client per destination origin.
    Pooled {
        clients: ClientRegistry,
        max_body_size: usize,
    },
}

impl Upstream {
    pub fn new(kind: EngineKind, settings: UpstreamSettings) -> Result<Self, RoutingError> {
        Ok(match kind {
            EngineKind::Standard => Self::Standard {
                client: settings.build_client()?,
            },
            EngineKind::Pooled => Self::Pooled {
                max_body_size: settings.max_body_size,
                clients: ClientRegistry::new(settings),
            },
        })
    }

    /// Upstream clients built so far.
    pub fn client_count(&self) -> usize {
        match self {
            Self::Standard { .. } => 1,
            Self::Pooled { clients, .. } => clients.origin_count(),
        }
    }

    pub fn bind(&mut self, endpoint: &str, destination: Arc<Destination>) -> Result<Arc<dyn Forwarder>, RoutingError> {
        match self {
            Self::Standard { client } => Ok(Arc::new(SingleHostProxy::for_route(
                client.clone(),
                endpoint,
                destination,
            ))),
            Self::Pooled {
                clients,
                max_body_size,
            } => {
                let client = clients.client_for(&destination)?;
                Ok(Arc::new(PooledForwarder::new(
                    client,
                    endpoint,
                    destination,
                    *max_body_size,
                )))
            }
        }
    }
}

/// Compile proxy rules into a route table. Fails on the first bad rule, so no
/// partial table is ever returned.
pub fn build_routes(rules: &[ProxyRule], upstream: &mut Upstream) -> Result<RouteTable, RoutingError> {
    let mut table = RouteTable::new();

    for rule in rules {
        if rule.endpoint == ROOT_PATH || rule.endpoint == LIVEZ_PATH {
            tracing::warn!(
                endpoint = %rule.endpoint,
                "Endpoint is shadowed by a reserved path for exact matches"
            );
        }

        table.register(&rule.endpoint, &rule.destination_url, |endpoint, destination| {
            upstream.bind(endpoint, destination)
        })?;

        tracing::info!(
            endpoint = %rule.endpoint,
            destination = %rule.destination_url,
            "Registered route"
        );
    }

    Ok(table)
}
