//! Data models for the SQL agent MCP server.
//!
//! This module contains the core data structures:
//! - Connection configuration and backend kinds
//! - Native column types, values and result sets

pub mod connection;
pub mod value;

pub use connection::{Credentials, DatabaseType};
pub use value::{ColumnMetadata, NativeType, NativeValue, ResultSet};
