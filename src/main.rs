//! SQL Agent MCP Server - Main entry point.
//!
//! This server exposes a read-query tool, a schema catalog resource and an
//! analyst prompt so AI agents can answer business questions from an
//! analytical database (PostgreSQL, MySQL, SQLite).

use clap::Parser;
use sql_agent_mcp::config::{self, Config, TransportMode};
use sql_agent_mcp::db::{ConnectionManager, HandleState};
use sql_agent_mcp::tools::CatalogReader;
use sql_agent_mcp::transport::{HttpTransport, StdioTransport, Transport};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Console output goes to stderr: stdout carries the stdio transport.
fn init_tracing(config: &Config) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let env_file = config::load_env_file(None);
    let config = Config::parse();

    if let Err(e) = init_tracing(&config) {
        eprintln!("Error: cannot open log file: {}", e);
        std::process::exit(1);
    }

    info!(
        transport = %config.transport,
        backend = %config.backend,
        "Starting SQL Agent MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded environment from file");
    }

    let connection_manager = Arc::new(
        ConnectionManager::new(config.credentials())
            .with_connect_timeout(config.connect_timeout_duration()),
    );

    // Connect eagerly; a failure is retried on the first query
    if connection_manager.connect().await == HandleState::Absent {
        warn!("Starting without a database connection");
    }

    let catalog = CatalogReader::new(config.catalog_path.clone());
    if catalog.path().is_none() {
        warn!("CATALOG_PATH is not set, the catalog resource will return an error");
    }

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(connection_manager, catalog);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                connection_manager,
                catalog,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
