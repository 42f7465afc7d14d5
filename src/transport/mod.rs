//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations for the MCP protocol:
//! - Stdio: Standard input/output for CLI integration
//! - HTTP: Streamable HTTP for web clients
//!
//! Both share the shutdown routine defined here.

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::db::ConnectionManager;
use crate::error::DbResult;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tracing::{error, info, warn};

/// Trait for MCP transport implementations.
///
/// Transports handle the low-level communication between the MCP server
/// and clients, abstracting away the protocol details.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Process-wide shutdown flag.
#[derive(Debug, Default)]
pub struct Shutdown {
    in_progress: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark shutdown as started. Returns `true` if it had already started.
    pub fn begin(&self) -> bool {
        self.in_progress.swap(true, Ordering::SeqCst)
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }
}

/// Close the database connection and stop.
///
/// A second invocation (e.g. a repeated signal while closing) terminates the
/// process immediately with exit code 1.
pub async fn shutdown(connection_manager: &ConnectionManager, state: &Shutdown) {
    info!("Shutting down server");
    if state.begin() {
        warn!("Shutdown already in progress, forcing immediate exit");
        std::process::exit(1);
    }
    connection_manager.close().await;
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::HandleState;
    use crate::models::Credentials;

    #[test]
    fn test_shutdown_begin_reports_repeat() {
        let state = Shutdown::new();
        assert!(!state.in_progress());
        assert!(!state.begin());
        assert!(state.in_progress());
        assert!(state.begin());
    }

    #[tokio::test]
    async fn test_first_shutdown_closes_connection() {
        let manager = ConnectionManager::new(Credentials::sqlite("/nonexistent/dir/x.db"));
        let state = Shutdown::new();
        shutdown(&manager, &state).await;
        assert!(state.in_progress());
        assert_eq!(manager.state().await, HandleState::Absent);
    }
}
