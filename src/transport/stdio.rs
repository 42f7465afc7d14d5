//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::mcp::DataAgentService;
use crate::tools::CatalogReader;
use crate::transport::{Shutdown, Transport, shutdown, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout, as newline-delimited JSON-RPC.
pub struct StdioTransport {
    connection_manager: Arc<ConnectionManager>,
    catalog: CatalogReader,
    shutdown: Arc<Shutdown>,
}

impl StdioTransport {
    /// Create a new stdio transport.
    ///
    /// # Arguments
    ///
    /// * `connection_manager` - Shared owner of the database connection
    /// * `catalog` - Reader for the schema catalog document
    pub fn new(connection_manager: Arc<ConnectionManager>, catalog: CatalogReader) -> Self {
        Self {
            connection_manager,
            catalog,
            shutdown: Arc::new(Shutdown::new()),
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server on stdin/stdout");

        let service = DataAgentService::new(self.connection_manager.clone(), self.catalog.clone());

        let running_service = service.serve(stdio()).await.map_err(|e| {
            DbError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        shutdown(&self.connection_manager, &self.shutdown).await;
                        return Err(DbError::internal(format!(
                            "Stdio transport error: {}",
                            e
                        )));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            // A second signal re-enters the shutdown routine, which exits
            let connection_manager = self.connection_manager.clone();
            let state = self.shutdown.clone();
            tokio::spawn(async move {
                wait_for_signal().await;
                shutdown(&connection_manager, &state).await;
            });
        }

        shutdown(&self.connection_manager, &self.shutdown).await;

        if shutdown_requested {
            // tokio::select! cannot interrupt blocking stdin reads
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;

    #[test]
    fn test_stdio_transport_creation() {
        let manager = Arc::new(ConnectionManager::new(Credentials::sqlite("retail.db")));
        let transport = StdioTransport::new(manager, CatalogReader::default());
        assert_eq!(transport.name(), "stdio");
        assert!(!transport.shutdown.in_progress());
    }
}
