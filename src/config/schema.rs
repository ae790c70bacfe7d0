//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxierConfig {
    /// Listener and engine settings.
    pub server: ServerConfig,

    /// Transport timeouts, applied to every route alike.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Ordered proxy rules.
    pub proxy: Vec<ProxyRule>,
}

/// Listener and engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to bind.
    pub listen_port: u16,

    /// Engine selector: `false` runs the standard engine, `true` the pooled one.
    pub pooled: bool,

    /// Maximum concurrent inbound connections (backpressure).
    pub max_connections: usize,

    /// Largest request body the pooled engine buffers, in bytes.
    pub max_body_size: usize,
}

impl ServerConfig {
    /// `host:port` bind address. IPv6 hosts are bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.listen_port)
        } else {
            format!("{}:{}", self.host, self.listen_port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            listen_port: 8080,
            pooled: false,
            max_connections: 10_000,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// Timeout configuration, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to read a request's headers.
    pub read_secs: u64,

    /// Time allowed for the whole upstream exchange.
    pub write_secs: u64,

    /// Idle timeout for pooled upstream connections.
    pub idle_secs: u64,

    /// Upstream connection establishment timeout.
    pub connect_secs: u64,

    /// Graceful shutdown deadline.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 15,
            idle_secs: 60,
            connect_secs: 5,
            shutdown_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One endpoint → destination mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProxyRule {
    /// Inbound path prefix.
    pub endpoint: String,

    /// Upstream base URL.
    pub destination_url: String,
}

impl ProxyRule {
    pub fn new(endpoint: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            destination_url: destination_url.into(),
        }
    }
}
