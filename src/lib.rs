//! SQL Agent MCP Server Library
//!
//! This library exposes an analytical SQL database (SQLite, PostgreSQL,
//! MySQL) to AI agents over MCP: a read-query tool returning a JSON envelope,
//! a schema catalog resource and an analyst prompt.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DataAgentService;
