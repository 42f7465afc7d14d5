//! Configuration handling for the SQL agent MCP server.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! Database settings are not validated here: a missing host or bad password
//! only shows up when the connection is first used.

use crate::db::connection::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::models::{Credentials, DatabaseType};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the SQL agent MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-agent-mcp",
    about = "MCP server giving AI agents read-query access to an analytical SQL database",
    version,
    author
)]
pub struct Config {
    /// Database backend
    #[arg(long, value_enum, default_value = "postgres", env = "DB_BACKEND")]
    pub backend: DatabaseType,

    /// Database host (for SQLite, the path of the database file)
    #[arg(long, env = "DB_HOST")]
    pub host: Option<String>,

    /// Database port (defaults to the backend's standard port)
    #[arg(long, env = "DB_PORT")]
    pub port: Option<u16>,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database name
    #[arg(long = "database", env = "DB_NAME")]
    pub database: Option<String>,

    /// Path of the schema catalog document
    #[arg(long, env = "CATALOG_PATH")]
    pub catalog_path: Option<PathBuf>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Also append logs to this file
    #[arg(long, env = "MCP_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Load variables from a `.env` file into the process environment.
///
/// With no explicit path the file is searched for from the current directory
/// upwards. Variables already present in the environment are left untouched
/// and a missing file is not an error. Returns the path that was loaded.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            backend: DatabaseType::PostgreSQL,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            catalog_path: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
            log_file: None,
        }
    }

    /// Credentials for the database connection.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            db_type: self.backend,
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, DatabaseType::PostgreSQL);
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_connect_timeout_duration() {
        let config = Config {
            connect_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_parse_database_flags() {
        let config = Config::try_parse_from([
            "sql-agent-mcp",
            "--backend",
            "mysql",
            "--host",
            "warehouse.internal",
            "--port",
            "3307",
            "--user",
            "analyst",
            "--password",
            "secret",
            "--database",
            "retail",
        ])
        .unwrap();

        let creds = config.credentials();
        assert_eq!(creds.db_type, DatabaseType::MySQL);
        assert_eq!(creds.host.as_deref(), Some("warehouse.internal"));
        assert_eq!(creds.port, Some(3307));
        assert_eq!(creds.user.as_deref(), Some("analyst"));
        assert_eq!(creds.password.as_deref(), Some("secret"));
        assert_eq!(creds.database.as_deref(), Some("retail"));
    }

    #[test]
    fn test_parse_backend_aliases() {
        let config =
            Config::try_parse_from(["sql-agent-mcp", "--backend", "postgresql"]).unwrap();
        assert_eq!(config.backend, DatabaseType::PostgreSQL);

        let config = Config::try_parse_from(["sql-agent-mcp", "--backend", "mariadb"]).unwrap();
        assert_eq!(config.backend, DatabaseType::MySQL);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        assert!(Config::try_parse_from(["sql-agent-mcp", "--backend", "oracle"]).is_err());
    }

    #[test]
    fn test_parse_sqlite_with_catalog() {
        let config = Config::try_parse_from([
            "sql-agent-mcp",
            "--backend",
            "sqlite",
            "--host",
            "/data/retail.db",
            "--catalog-path",
            "/data/catalog.json",
            "--transport",
            "http",
        ])
        .unwrap();
        assert_eq!(config.credentials().target(), "/data/retail.db");
        assert_eq!(
            config.catalog_path.as_deref(),
            Some(std::path::Path::new("/data/catalog.json"))
        );
        assert_eq!(config.transport, TransportMode::Http);
    }
}
