//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → dispatcher.rs (reserved paths first, then route lookup)
//!     → router.rs (longest endpoint prefix)
//!     → Return: bound forwarder or NotFound
//!
//! Route Compilation (at startup):
//!     ProxyRule[]
//!     → destination.rs (resolve destination URL)
//!     → bind forwarder for (endpoint, destination)
//!     → insert sorted by descending endpoint length
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Prefix matching only, no regex in hot path
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod destination;
pub mod dispatcher;
pub mod rewrite;
pub mod router;

pub use destination::Destination;
pub use dispatcher::{Dispatch, Dispatcher};
pub use rewrite::rewrite_path;
pub use router::{Route, RouteTable};

/// Errors raised while building the route table.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("invalid destination URL {destination}: {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}
