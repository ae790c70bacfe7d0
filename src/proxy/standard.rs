//! Streaming single-host forwarder.
//!
//! # Responsibilities
//! - Run the director to point the request at its upstream
//! - Stream the request body up and the response body back
//! - Map every upstream failure to a generic 502
//!
//! # Design Decisions
//! - Bodies are never buffered
//! - Upstream error details are logged, not returned to the client

use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, Request, Response, Uri};
use futures_util::future::{BoxFuture, FutureExt};
use hyper::body::Body as _;

use crate::http::response;
use crate::net::connection::PeerAddr;
use crate::proxy::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::proxy::{ForwardError, Forwarder, RequestContext};
use crate::routing::Destination;

/// Request mutation hook run before the upstream call.
pub type Director = Box<dyn Fn(&mut Parts) -> Result<RequestContext, ForwardError> + Send + Sync>;

/// Forwards to one upstream host over a shared streaming client.
pub struct SingleHostProxy {
    client: reqwest::Client,
    director: Director,
}

impl SingleHostProxy {
    pub fn new(client: reqwest::Client, director: Director) -> Self {
        Self { client, director }
    }

    /// Proxy for one route: the director strips `endpoint`, joins the
    /// remainder onto the destination base path and retargets the URI.
    pub fn for_route(client: reqwest::Client, endpoint: &str, destination: Arc<Destination>) -> Self {
        let endpoint = endpoint.to_string();
        let director = move |parts: &mut Parts| -> Result<RequestContext, ForwardError> {
            let context = RequestContext::resolve(&parts.uri, &endpoint, &destination)?;
            retarget(parts, &context.target_url)?;
            // The upstream host comes from the target URL.
            parts.headers.remove(header::HOST);
            context.log(&destination);
            Ok(context)
        };

        Self::new(client, Box::new(director))
    }

    pub async fn serve(&self, req: Request<Body>) -> Response<Body> {
        match self.proxy(req).await {
            Ok(res) => res,
            Err(ForwardError::InvalidEndpoint { path, endpoint }) => {
                tracing::warn!(path = %path, endpoint = %endpoint, "Request outside endpoint");
                response::invalid_endpoint()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Upstream error");
                response::bad_gateway()
            }
        }
    }

    async fn proxy(&self, req: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = req.into_parts();
        let context = (self.director)(&mut parts)?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        if let Some(PeerAddr(peer)) = parts.extensions.get::<PeerAddr>() {
            append_forwarded_for(&mut headers, peer.ip());
        }

        // The director owns the target; the context only feeds logging.
        tracing::trace!(target_url = %context.target_url, uri = %parts.uri, "Forwarding");
        let mut upstream = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(headers);
        if !body.is_end_stream() {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let res = upstream.send().await?;

        let status = res.status();
        let mut headers = res.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut out = Response::new(Body::from_stream(res.bytes_stream()));
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Point `parts` at `target_url`.
pub fn retarget(parts: &mut Parts, target_url: &str) -> Result<(), ForwardError> {
    parts.uri = target_url.parse::<Uri>().map_err(|source| ForwardError::Target {
        url: target_url.to_string(),
        source,
    })?;
    Ok(())
}

impl Forwarder for SingleHostProxy {
    fn forward(self: Arc<Self>, req: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        async move { self.serve(req).await }.boxed()
    }
}
