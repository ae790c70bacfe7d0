//! Buffered forwarder over per-origin pooled clients.
//!
//! # Responsibilities
//! - Share one upstream client per destination origin
//! - Buffer the request body up to the configured limit
//! - Copy the upstream status, headers and body back to the caller

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::http::response;
use crate::net::connection::PeerAddr;
use crate::proxy::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::proxy::{ForwardError, Forwarder, RequestContext, UpstreamSettings};
use crate::routing::{Destination, RoutingError};

/// Upstream clients keyed by `scheme://host[:port]`.
#[derive(Debug)]
pub struct ClientRegistry {
    settings: UpstreamSettings,
    clients: HashMap<String, reqwest::Client>,
}

impl ClientRegistry {
    pub fn new(settings: UpstreamSettings) -> Self {
        Self {
            settings,
            clients: HashMap::new(),
        }
    }

    /// Client for `destination`'s origin, created on first use.
    pub fn client_for(&mut self, destination: &Destination) -> Result<reqwest::Client, RoutingError> {
        match self.clients.entry(destination.origin()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let client = self.settings.build_client()?;
                tracing::debug!(origin = %entry.key(), "Created upstream client");
                Ok(entry.insert(client).clone())
            }
        }
    }

    /// Number of distinct origins.
    pub fn origin_count(&self) -> usize {
        self.clients.len()
    }
}

pub struct PooledForwarder {
    client: reqwest::Client,
    endpoint: String,
    destination: Arc<Destination>,
    max_body_size: usize,
}

impl PooledForwarder {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        destination: Arc<Destination>,
        max_body_size: usize,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            destination,
            max_body_size,
        }
    }

    pub async fn serve(&self, req: Request<Body>) -> Response<Body> {
        match self.proxy(req).await {
            Ok(res) => res,
            Err(ForwardError::InvalidEndpoint { path, endpoint }) => {
                tracing::warn!(path = %path, endpoint = %endpoint, "Request outside endpoint");
                response::invalid_endpoint()
            }
            Err(ForwardError::BodyTooLarge { limit }) => {
                tracing::debug!(limit, "Request body too large");
                response::payload_too_large()
            }
            Err(e @ ForwardError::RequestBody(_)) => {
                tracing::debug!(error = %e, "Failed to read request body");
                response::bad_request(e)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Upstream error");
                response::proxy_error(e)
            }
        }
    }

    async fn proxy(&self, req: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let context = RequestContext::resolve(req.uri(), &self.endpoint, &self.destination)?;
        context.log(&self.destination);

        let (parts, body) = req.into_parts();
        let limit = self.max_body_size;
        let payload = Limited::new(body, limit)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    ForwardError::BodyTooLarge { limit }
                } else {
                    ForwardError::RequestBody(e)
                }
            })?
            .to_bytes();

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(PeerAddr(peer)) = parts.extensions.get::<PeerAddr>() {
            append_forwarded_for(&mut headers, peer.ip());
        }

        let res = self
            .client
            .request(parts.method, context.target_url.as_str())
            .headers(headers)
            .body(payload)
            .send()
            .await?;

        let status = res.status();
        let mut headers = res.headers().clone();
        strip_hop_by_hop(&mut headers);
        let body = res.bytes().await?;

        let mut out = Response::new(Body::from(body));
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

impl Forwarder for PooledForwarder {
    fn forward(self: Arc<Self>, req: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        async move { self.serve(req).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxierConfig;
    use axum::http::StatusCode;

    fn registry() -> ClientRegistry {
        ClientRegistry::new(UpstreamSettings::from_config(&ProxierConfig::default()))
    }

    fn forwarder(endpoint: &str, destination: &str, max_body_size: usize) -> Arc<PooledForwarder> {
        let destination = Arc::new(Destination::parse(destination).unwrap());
        let client = registry().client_for(&destination).unwrap();
        Arc::new(PooledForwarder::new(client, endpoint, destination, max_body_size))
    }

    async fn body_text(res: Response<Body>) -> String {
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn test_registry_shares_clients_per_origin() {
        let mut registry = registry();
        let a = Destination::parse("http://127.0.0.1:3000/a").unwrap();
        let b = Destination::parse("http://127.0.0.1:3000/b").unwrap();
        let tls = Destination::parse("https://127.0.0.1:3000").unwrap();

        registry.client_for(&a).unwrap();
        registry.client_for(&b).unwrap();
        assert_eq!(registry.origin_count(), 1);

        registry.client_for(&tls).unwrap();
        assert_eq!(registry.origin_count(), 2);
    }

    #[tokio::test]
    async fn test_foreign_path_is_invalid_endpoint() {
        let forwarder = forwarder("/api", "http://127.0.0.1:3000", 1024);
        let req = Request::builder().uri("/other").body(Body::empty()).unwrap();

        let res = forwarder.forward(req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(res).await, "Invalid endpoint");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let forwarder = forwarder("/api", "http://127.0.0.1:3000", 4);
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .body(Body::from("too many bytes"))
            .unwrap();

        let res = forwarder.forward(req).await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_text(res).await, "Request body too large");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_reports_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let forwarder = forwarder("/api", &format!("http://127.0.0.1:{port}"), 1024);
        let req = Request::builder().uri("/api").body(Body::empty()).unwrap();

        let res = forwarder.forward(req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(res).await.starts_with("Proxy error: "));
    }
}
