//! Destination resolution.
//!
//! # Responsibilities
//! - Parse a configured destination URL once, at registration time
//! - Keep the parts the forwarders need (scheme, authority, base path)
//!
//! # Design Decisions
//! - Only `http` and `https` are accepted; the scheme is never rewritten
//! - The base path is stored without its trailing slash so joining it with a
//!   rewritten suffix always produces exactly one separator

use std::fmt;

use url::Url;

use crate::routing::RoutingError;

/// A parsed upstream target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    scheme: String,
    host: String,
    base_path: String,
}

impl Destination {
    /// Resolve a destination URL string.
    pub fn parse(destination: &str) -> Result<Self, RoutingError> {
        let invalid = |reason: String| RoutingError::InvalidDestination {
            destination: destination.to_string(),
            reason,
        };

        let url = Url::parse(destination).map_err(|e| invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme `{other}`"))),
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(invalid("missing host".to_string())),
        };

        // `Url::port` is `None` when the port is the scheme default.
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host and explicit port, e.g. `api.internal:8443`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path prefix on the upstream, without trailing slash. Empty for root.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// `scheme://host`, the key the pooled engine shares clients under.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Full upstream URL for an already rewritten path.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.origin(), path, q),
            _ => format!("{}{}", self.origin(), path),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.base_path)
    }
}
