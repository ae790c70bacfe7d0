//! Crate-level error type.

use crate::config::ConfigError;
use crate::lifecycle::ServerError;
use crate::routing::RoutingError;

#[derive(Debug, thiserror::Error)]
pub enum ProxierError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
