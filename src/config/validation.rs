//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port set)
//! - Reject empty, relative or duplicate endpoints
//! - Resolve every destination once so a bad URL fails before startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxierConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::ProxierConfig;
use crate::routing::{Destination, RoutingError};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("server.host cannot be empty")]
    EmptyHost,

    #[error("server.listen_port cannot be 0")]
    ZeroPort,

    #[error("server.max_connections must be greater than 0")]
    ZeroMaxConnections,

    #[error("timeouts.{0} must be greater than 0")]
    ZeroTimeout(&'static str),

    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("at least one proxy rule must be defined")]
    NoRules,

    #[error("proxy rule #{index}: endpoint cannot be empty")]
    EmptyEndpoint { index: usize },

    #[error("proxy rule #{index}: endpoint `{endpoint}` must start with '/'")]
    RelativeEndpoint { index: usize, endpoint: String },

    #[error("proxy rule #{index}: destination_url cannot be empty")]
    EmptyDestination { index: usize },

    #[error("duplicate proxy endpoint: {0}")]
    DuplicateEndpoint(String),

    #[error("proxy rule #{index}: {source}")]
    InvalidDestination {
        index: usize,
        #[source]
        source: RoutingError,
    },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.server.listen_port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.server.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("read_secs"));
    }
    if config.timeouts.write_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("write_secs"));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if config.proxy.is_empty() {
        errors.push(ValidationError::NoRules);
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.proxy.iter().enumerate() {
        if rule.endpoint.is_empty() {
            errors.push(ValidationError::EmptyEndpoint { index });
        } else if !rule.endpoint.starts_with('/') {
            errors.push(ValidationError::RelativeEndpoint {
                index,
                endpoint: rule.endpoint.clone(),
            });
        } else if !seen.insert(rule.endpoint.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint(rule.endpoint.clone()));
        }

        if rule.destination_url.is_empty() {
            errors.push(ValidationError::EmptyDestination { index });
        } else if let Err(source) = Destination::parse(&rule.destination_url) {
            errors.push(ValidationError::InvalidDestination { index, source });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProxyRule;

    fn valid_config() -> ProxierConfig {
        ProxierConfig {
            proxy: vec![
                ProxyRule::new("/test", "https://example.com"),
                ProxyRule::new("/mock", "https://mockapi.com"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_rules() {
        let config = ProxierConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::NoRules]));
    }

    #[test]
    fn test_duplicate_endpoint() {
        let mut config = valid_config();
        config.proxy.push(ProxyRule::new("/test", "https://other.example.com"));

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DuplicateEndpoint(e)] if e == "/test"
        ));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.server.host = String::new();
        config.server.listen_port = 0;
        config.timeouts.write_secs = 0;
        config.proxy.push(ProxyRule::new("", "https://example.com"));
        config.proxy.push(ProxyRule::new("relative", ""));
        config.proxy.push(ProxyRule::new("/bad", "://invalid-url"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 7, "{errors:?}");
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyHost)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroPort)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroTimeout("write_secs"))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyEndpoint { index: 2 })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RelativeEndpoint { index: 3, .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyDestination { index: 3 })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidDestination { index: 4, .. })));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = valid_config();
        config.observability.log_level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::UnknownLogLevel(_)]));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors.as_slice(), [ValidationError::MetricsAddress(_)]));
    }
}
