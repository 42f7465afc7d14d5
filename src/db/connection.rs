//! Single-handle connection management.
//!
//! The server owns exactly one database connection. It is opened eagerly at
//! startup, checked for liveness before each use and re-opened lazily when it
//! has gone away. Every cursor request holds the handle lock until the caller
//! drops the returned guard, so two queries never interleave on the wire.

use crate::error::{DbError, DbResult};
use crate::impl_db_dispatch;
use crate::models::{Credentials, DatabaseType};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Default time allowed for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Database-specific connection (avoids AnyConnection limitations).
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Open a new connection for the given credentials.
    pub async fn open(credentials: &Credentials) -> DbResult<Self> {
        let target = credentials.target();
        let connect_error = |e: sqlx::Error| {
            DbError::connection(
                format!("Failed to connect to {}: {}", target, e),
                "Check the database host, port and credentials",
            )
        };

        match credentials.db_type {
            DatabaseType::MySQL => {
                let options = mysql_options(credentials)?;
                let conn = MySqlConnection::connect_with(&options)
                    .await
                    .map_err(connect_error)?;
                Ok(DbConnection::MySql(conn))
            }
            DatabaseType::PostgreSQL => {
                let options = postgres_options(credentials)?;
                let conn = PgConnection::connect_with(&options)
                    .await
                    .map_err(connect_error)?;
                Ok(DbConnection::Postgres(conn))
            }
            DatabaseType::SQLite => {
                let options = sqlite_options(credentials)?;
                let conn = SqliteConnection::connect_with(&options)
                    .await
                    .map_err(connect_error)?;
                Ok(DbConnection::SQLite(conn))
            }
        }
    }

    /// Check that the server still answers on this connection.
    pub async fn ping(&mut self) -> DbResult<()> {
        impl_db_dispatch!(self, {
            MySql(c) => c.ping().await?,
            Postgres(c) => c.ping().await?,
            SQLite(c) => c.ping().await?,
        });
        Ok(())
    }

    /// Close the connection with a graceful protocol shutdown.
    pub async fn close(self) -> DbResult<()> {
        impl_db_dispatch!(self, {
            MySql(c) => c.close().await?,
            Postgres(c) => c.close().await?,
            SQLite(c) => c.close().await?,
        });
        Ok(())
    }

    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

fn require_host(credentials: &Credentials) -> DbResult<&str> {
    credentials.host.as_deref().ok_or_else(|| {
        let setting = match credentials.db_type {
            DatabaseType::SQLite => "the SQLite database file",
            _ => "the database host",
        };
        DbError::connection(
            format!("No value configured for {}", setting),
            "Set DB_HOST or pass --host",
        )
    })
}

fn mysql_options(credentials: &Credentials) -> DbResult<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .host(require_host(credentials)?)
        .charset("utf8mb4");
    if let Some(port) = credentials.effective_port() {
        options = options.port(port);
    }
    if let Some(user) = &credentials.user {
        options = options.username(user);
    }
    if let Some(password) = &credentials.password {
        options = options.password(password);
    }
    if let Some(database) = &credentials.database {
        options = options.database(database);
    }
    Ok(options)
}

fn postgres_options(credentials: &Credentials) -> DbResult<PgConnectOptions> {
    let mut options = PgConnectOptions::new().host(require_host(credentials)?);
    if let Some(port) = credentials.effective_port() {
        options = options.port(port);
    }
    if let Some(user) = &credentials.user {
        options = options.username(user);
    }
    if let Some(password) = &credentials.password {
        options = options.password(password);
    }
    if let Some(database) = &credentials.database {
        options = options.database(database);
    }
    Ok(options)
}

fn sqlite_options(credentials: &Credentials) -> DbResult<SqliteConnectOptions> {
    // A missing file is a configuration mistake, not a request for a new database
    Ok(SqliteConnectOptions::new()
        .filename(require_host(credentials)?)
        .create_if_missing(false))
}

/// Whether the handle slot currently holds a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Absent,
    Open,
}

#[derive(Debug, Default)]
struct HandleSlot {
    connection: Option<DbConnection>,
    /// Reason of the most recent failed connect, surfaced to callers
    last_error: Option<String>,
}

impl HandleSlot {
    fn state(&self) -> HandleState {
        if self.connection.is_some() {
            HandleState::Open
        } else {
            HandleState::Absent
        }
    }
}

/// Exclusive access to the open connection.
pub type ConnectionGuard<'a> = MappedMutexGuard<'a, DbConnection>;

/// Owns the single database connection handle.
#[derive(Debug)]
pub struct ConnectionManager {
    credentials: Credentials,
    connect_timeout: Duration,
    slot: Mutex<HandleSlot>,
}

impl ConnectionManager {
    /// Create a manager without connecting.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            slot: Mutex::new(HandleSlot::default()),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn db_type(&self) -> DatabaseType {
        self.credentials.db_type
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Open the connection if it is not open yet.
    ///
    /// Failures are logged and remembered, never returned: the server keeps
    /// running and the next `acquire` retries.
    pub async fn connect(&self) -> HandleState {
        let mut slot = self.slot.lock().await;
        if slot.connection.is_none() {
            self.open_into(&mut slot).await;
        }
        slot.state()
    }

    /// Current handle state.
    pub async fn state(&self) -> HandleState {
        self.slot.lock().await.state()
    }

    /// Get exclusive access to a live connection.
    ///
    /// An open handle is pinged first; a dead one is dropped and re-opened.
    /// If no connection can be established the error carries the reason of
    /// the failed connect.
    pub async fn acquire(&self) -> DbResult<ConnectionGuard<'_>> {
        let mut slot = self.slot.lock().await;

        // A half-open connection must not hold the lock forever
        let alive = match slot.connection.as_mut() {
            Some(conn) => {
                match with_deadline(self.connect_timeout, "pinging", conn.ping()).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Connection failed liveness check, reconnecting");
                        false
                    }
                }
            }
            None => false,
        };

        if !alive {
            if slot.connection.take().is_some() {
                debug!("Dropped stale connection handle");
            }
            self.open_into(&mut slot).await;
        }

        MutexGuard::try_map(slot, |s| s.connection.as_mut()).map_err(|slot| {
            let reason = slot
                .last_error
                .clone()
                .unwrap_or_else(|| "connection has not been established".to_string());
            error!(reason = %reason, "Cursor requested without a database connection");
            DbError::no_connection(reason)
        })
    }

    /// Close the connection. Closing an absent handle only logs a warning.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        match slot.connection.take() {
            Some(conn) => match conn.close().await {
                Ok(()) => info!("Connection to database closed"),
                Err(e) => error!(error = %e, "Error closing connection to database"),
            },
            None => warn!("Connection to database is already closed"),
        }
    }

    async fn open_into(&self, slot: &mut HandleSlot) {
        let target = self.credentials.target();
        info!(
            db_type = %self.credentials.db_type,
            target = %target,
            "Connecting to database"
        );

        let connecting = format!("connecting to {}", target);
        let result = with_deadline(
            self.connect_timeout,
            &connecting,
            DbConnection::open(&self.credentials),
        )
        .await;

        match result {
            Ok(conn) => {
                info!(target = %target, "Connected to database");
                slot.connection = Some(conn);
                slot.last_error = None;
            }
            Err(e) => {
                error!(target = %target, error = %e, "Error connecting to database");
                slot.last_error = Some(e.to_string());
            }
        }
    }
}

/// Run a connection step, failing with a connection error once `limit`
/// has elapsed.
async fn with_deadline<T>(
    limit: Duration,
    step: &str,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbError::connection(
            format!("Timed out after {:?} {}", limit, step),
            "Check that the database server is reachable",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hung_step_times_out_as_connection_error() {
        let err = with_deadline(
            Duration::from_millis(20),
            "pinging",
            std::future::pending::<DbResult<()>>(),
        )
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Connection failed: Timed out after 20ms pinging");
    }

    #[tokio::test]
    async fn test_finished_step_keeps_its_result() {
        let ready = async { Ok::<_, DbError>(7) };
        let value = with_deadline(Duration::from_secs(1), "pinging", ready)
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_missing_host_is_connection_error() {
        let creds = Credentials::new(DatabaseType::PostgreSQL);
        let err = postgres_options(&creds).unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.to_string().contains("database host"));
    }

    #[test]
    fn test_missing_sqlite_path_is_connection_error() {
        let creds = Credentials::new(DatabaseType::SQLite);
        let err = sqlite_options(&creds).unwrap_err();
        assert!(err.to_string().contains("SQLite database file"));
    }

    #[tokio::test]
    async fn test_new_manager_is_absent() {
        let manager = ConnectionManager::new(Credentials::sqlite("/nonexistent/dir/x.db"));
        assert_eq!(manager.state().await, HandleState::Absent);
        assert_eq!(manager.db_type(), DatabaseType::SQLite);
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_reason() {
        let manager = ConnectionManager::new(Credentials::sqlite("/nonexistent/dir/x.db"));
        assert_eq!(manager.connect().await, HandleState::Absent);

        let err = manager.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::NoConnection { .. }));
        assert!(err.to_string().contains("unable to open database file"));
    }

    #[tokio::test]
    async fn test_close_absent_handle_is_noop() {
        let manager = ConnectionManager::new(Credentials::sqlite("/nonexistent/dir/x.db"));
        manager.close().await;
        manager.close().await;
        assert_eq!(manager.state().await, HandleState::Absent);
    }
}
