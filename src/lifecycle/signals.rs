//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT or SIGTERM
//! - Report which one arrived so the binary can log it
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The binary owns the reaction; this module only observes

/// Resolve once a termination signal arrives.
pub async fn termination() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => "SIGINT",
        () = sigterm => "SIGTERM",
    }
}
