//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! This transport uses HTTP with SSE streaming responses,
//! which is suitable for web-based MCP integrations. All sessions share the
//! single database connection.

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::mcp::DataAgentService;
use crate::tools::CatalogReader;
use crate::transport::{Shutdown, Transport, shutdown, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Time allowed for open SSE streams to finish after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation with Streamable HTTP support.
pub struct HttpTransport {
    connection_manager: Arc<ConnectionManager>,
    catalog: CatalogReader,
    shutdown: Arc<Shutdown>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `connection_manager` - Shared owner of the database connection
    /// * `catalog` - Reader for the schema catalog document
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `endpoint` - MCP endpoint path (e.g., "/mcp")
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        catalog: CatalogReader,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            connection_manager,
            catalog,
            shutdown: Arc::new(Shutdown::new()),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the MCP endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let connection_manager = self.connection_manager.clone();
        let catalog = self.catalog.clone();

        // One service per session, all backed by the same connection manager
        let service = StreamableHttpService::new(
            move || {
                Ok(DataAgentService::new(
                    connection_manager.clone(),
                    catalog.clone(),
                ))
            },
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service doesn't support root path "/", use fallback_service instead
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Race between: server completing normally vs forced timeout/second signal after shutdown
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        shutdown(&self.connection_manager, &self.shutdown).await;
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, closing anyway");
                    }
                    _ = wait_for_signal() => {
                        // Second signal: the shutdown routine was not entered yet,
                        // mark it so the call below escalates to an immediate exit
                        self.shutdown.begin();
                    }
                }
            } => {}
        }

        shutdown(&self.connection_manager, &self.shutdown).await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;

    fn manager() -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(Credentials::sqlite("retail.db")))
    }

    #[test]
    fn test_http_transport_creation() {
        let transport =
            HttpTransport::new(manager(), CatalogReader::default(), "127.0.0.1", 8080, "/mcp");
        assert_eq!(transport.name(), "http");
        assert_eq!(transport.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_http_transport_custom_endpoint() {
        let transport = HttpTransport::new(
            manager(),
            CatalogReader::default(),
            "0.0.0.0",
            3000,
            "/custom/path",
        );
        assert_eq!(transport.bind_addr(), "0.0.0.0:3000");
        assert_eq!(transport.endpoint(), "/custom/path");
    }

    #[test]
    fn test_http_transport_root_endpoint() {
        let transport =
            HttpTransport::new(manager(), CatalogReader::default(), "127.0.0.1", 8080, "/");
        assert_eq!(transport.endpoint(), "/");
    }
}
