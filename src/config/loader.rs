//! Configuration loading from disk and environment.
//!
//! A TOML file is optional: a deployment can be configured entirely through
//! `PROXIER_*` variables, including the rule table (`PROXIER_RULES`, a JSON
//! array of `{"endpoint", "destination"}` objects).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::schema::{ProxierConfig, ProxyRule};
use crate::config::validation::{validate_config, ValidationError};

/// `host:port`, applied before `PROXIER_HOST` and `PROXIER_LISTEN_PORT`.
pub const ENV_ADDRESS: &str = "PROXIER_ADDRESS";
pub const ENV_HOST: &str = "PROXIER_HOST";
pub const ENV_LISTEN_PORT: &str = "PROXIER_LISTEN_PORT";
/// Engine switch kept for existing deployments; `PROXIER_POOLED` wins.
pub const ENV_ENABLE_FASTHTTP: &str = "PROXIER_ENABLE_FASTHTTP";
pub const ENV_POOLED: &str = "PROXIER_POOLED";
/// Replaces every `[[proxy]]` rule from the file.
pub const ENV_RULES: &str = "PROXIER_RULES";
pub const ENV_LOG_LEVEL: &str = "PROXIER_LOG_LEVEL";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value `{value}` for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid PROXIER_RULES: {0}")]
    Rules(#[source] serde_json::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// The env file simply does not exist.
    pub fn is_missing_env_file(&self) -> bool {
        matches!(self, Self::EnvFile { source, .. } if source.not_found())
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One entry of `PROXIER_RULES`.
#[derive(Debug, Deserialize)]
struct EnvRule {
    endpoint: String,
    destination: String,
}

/// Load a TOML file, apply `PROXIER_*` environment overrides and validate.
pub fn load_config(path: &Path) -> Result<ProxierConfig, ConfigError> {
    load_config_from(Some(path), |var| std::env::var(var).ok())
}

/// Like [`load_config`], with variables resolved by `lookup`. Without a
/// path, defaults plus the environment make up the whole configuration.
pub fn load_config_from<F>(path: Option<&Path>, lookup: F) -> Result<ProxierConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => ProxierConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse and validate configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<ProxierConfig, ConfigError> {
    let config: ProxierConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Export the variables of a dotenv file into the process environment.
/// Variables already set are left untouched.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Override listener, engine, rules and logging from variables resolved by `lookup`.
pub fn apply_env_overrides<F>(config: &mut ProxierConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(address) = lookup(ENV_ADDRESS) {
        let (host, port) = split_address(&address).ok_or_else(|| ConfigError::Env {
            var: ENV_ADDRESS,
            value: address.clone(),
        })?;
        config.server.host = host;
        config.server.listen_port = port;
    }

    if let Some(host) = lookup(ENV_HOST) {
        config.server.host = host;
    }

    if let Some(port) = lookup(ENV_LISTEN_PORT) {
        config.server.listen_port = port.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_LISTEN_PORT,
            value: port.clone(),
        })?;
    }

    for var in [ENV_ENABLE_FASTHTTP, ENV_POOLED] {
        if let Some(value) = lookup(var) {
            config.server.pooled = parse_flag(var, value)?;
        }
    }

    if let Some(rules) = lookup(ENV_RULES) {
        let rules: Vec<EnvRule> = serde_json::from_str(&rules).map_err(ConfigError::Rules)?;
        config.proxy = rules
            .into_iter()
            .map(|rule| ProxyRule::new(rule.endpoint, rule.destination))
            .collect();
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    Ok(())
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env { var, value }),
    }
}

/// `host:port` or `[v6]:port`. An empty host means every interface.
fn split_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.trim().rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Some((host.to_string(), port))
}
