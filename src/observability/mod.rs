//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty, compact or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Only the binary installs the subscriber; library code just emits events
//! - Request ID flows through the standard engine via x-request-id
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
