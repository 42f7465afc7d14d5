//! MCP tool implementations.
//!
//! This module contains the handlers behind the MCP surface:
//! - `query`: Execute a read query and wrap the rows in the success envelope
//! - `catalog`: Read the static schema catalog
//! - `envelope`: Success/error response formatting
//! - `serializer`: Row to JSON conversion

pub mod catalog;
pub mod envelope;
pub mod query;
pub mod serializer;

pub use catalog::CatalogReader;
pub use query::{QueryToolHandler, ReadQueryInput};
