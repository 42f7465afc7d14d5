//! Database dispatch macros for reducing code duplication.
//!
//! The connection handle is an enum over the concrete sqlx connection types;
//! this macro expands a match over its variants so each backend arm stays a
//! single readable line.

/// Macro for generating database dispatch match arms.
///
/// This macro generates match arms for `DbConnection` variants, reducing the
/// need to manually write repetitive match statements.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => c.ping().await,
///     Postgres(c) => c.ping().await,
///     SQLite(c) => c.ping().await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
