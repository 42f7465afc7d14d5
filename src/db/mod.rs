//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Single connection handle management
//! - Query execution
//! - Type mappings
//! - Database dispatch macros for reducing code duplication

pub mod connection;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod types;

pub use connection::{ConnectionGuard, ConnectionManager, DbConnection, HandleState};
pub use executor::QueryExecutor;
