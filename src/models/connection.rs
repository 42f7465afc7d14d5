//! Connection-related data models.
//!
//! This module defines the database backend kind and the credentials used to
//! open the single connection handle.

use clap::ValueEnum;
use std::path::PathBuf;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    #[value(name = "postgres", alias = "postgresql")]
    PostgreSQL,
    /// Includes MariaDB
    #[value(name = "mysql", alias = "mariadb")]
    MySQL,
    #[value(name = "sqlite")]
    SQLite,
}

impl DatabaseType {
    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Credentials for the database connection.
///
/// Values are kept optional so that missing settings only fail at connect
/// time. For SQLite, `host` is the path of the database file.
#[derive(Clone)]
pub struct Credentials {
    pub db_type: DatabaseType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Contains sensitive data - never log
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Credentials {
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
        }
    }

    /// Credentials for a SQLite database file.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::new(DatabaseType::SQLite).with_host(path.into().to_string_lossy())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Port to connect to, falling back to the backend default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    /// Human-readable target for logs (no secrets).
    pub fn target(&self) -> String {
        let host = self.host.as_deref().unwrap_or("<unset>");
        match (self.db_type, self.effective_port()) {
            (DatabaseType::SQLite, _) | (_, None) => host.to_string(),
            (_, Some(port)) => format!("{}:{}", host, port),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}
