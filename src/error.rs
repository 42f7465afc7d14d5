//! Error types for the SQL agent MCP server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Tool and resource handlers never surface these as protocol faults: the MCP
//! service turns them into `Error: ...` text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("No connection to database: {reason}")]
    NoConnection { reason: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an error for a cursor requested while the handle is absent.
    pub fn no_connection(reason: impl Into<String>) -> Self {
        Self::NoConnection {
            reason: reason.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::NoConnection { .. } => {
                Some("Check DB_HOST, DB_USER and DB_PASSWORD and that the server is reachable")
            }
            _ => None,
        }
    }

    /// Check if this error is a connectivity failure.
    ///
    /// Informational only: nothing in the server retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::NoConnection { .. })
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the database host, port and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::connection(err.to_string(), "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::database(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::connection(
                "Database worker crashed",
                "The connection will be re-established on the next request",
            ),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));

        let err = DbError::no_connection("connection refused");
        assert_eq!(
            err.to_string(),
            "No connection to database: connection refused"
        );
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(DbError::no_connection("refused").is_retryable());
        assert!(!DbError::database("syntax error", None).is_retryable());
        assert!(!DbError::catalog("missing").is_retryable());
    }

    #[test]
    fn test_database_error_keeps_sql_state() {
        let err = DbError::database("syntax error", Some("42601".to_string()));
        match err {
            DbError::Database { sql_state, .. } => assert_eq!(sql_state.as_deref(), Some("42601")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_suggestions_only_for_connectivity() {
        assert_eq!(
            DbError::connection("failed", "try again").suggestion(),
            Some("try again")
        );
        assert!(DbError::no_connection("refused").suggestion().is_some());
        assert!(DbError::database("syntax error", None).suggestion().is_none());
        assert!(DbError::catalog("missing").suggestion().is_none());
    }
}
