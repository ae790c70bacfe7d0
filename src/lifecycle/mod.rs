//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (server.rs):
//!     Config → Upstream clients → Route table → Dispatcher → Engine
//!
//! start():
//!     Bind listener → spawn accept loop (one task per connection)
//!     Bind failure → notify() channel
//!
//! stop(deadline) (shutdown.rs):
//!     Trigger → stop accepting → drain connections → abort at deadline
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```
//!
//! # Design Decisions
//! - Created → Started → Stopped, no restart
//! - Misordered calls are logged and ignored, never fatal
//! - Shutdown has a deadline: remaining connections are force-closed

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::{ProxyServer, ServerError};
pub use shutdown::Shutdown;
