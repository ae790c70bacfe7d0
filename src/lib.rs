//! Proxier: a path-prefix reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::Listener ──▶ http::Engine ──▶ routing::Dispatcher ──▶ proxy::Forwarder ──▶ Upstream
//!                 (accept loop,      (standard or      ("/", "/livez",        (rewrite path,
//!                  lifecycle)         pooled)           longest prefix)        stream or buffer)
//! ```
//!
//! Routes are compiled once from configuration. Each route binds its endpoint
//! prefix to one destination URL; the endpoint is stripped from the inbound
//! path and the remainder is appended to the destination's base path.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::ProxierConfig;
pub use error::ProxierError;
pub use http::EngineKind;
pub use lifecycle::{ProxyServer, ServerError};
