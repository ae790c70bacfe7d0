//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (lifecycle tracking, peer address)
//!     → Hand off to the HTTP engine
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked so shutdown can report what it cut off
//! - TLS termination is left to whatever sits in front of the proxy

pub mod connection;
pub mod listener;
