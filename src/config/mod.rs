//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read, parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → ProxierConfig (validated, immutable)
//!     → handed to ProxyServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_from, load_env_file, parse_config, ConfigError};
pub use schema::{LogFormat, ObservabilityConfig, ProxierConfig, ProxyRule, ServerConfig, TimeoutConfig};
pub use validation::{validate_config, ValidationError};
