//! Response envelope formatting for MCP tools.
//!
//! Successful tool calls return a compact JSON document:
//!
//! ```json
//! {"status":"success","metadata":{...},"results":[...]}
//! ```
//!
//! Failures are returned as plain `Error: ...` text.

use crate::error::{DbError, DbResult};
use crate::models::ColumnMetadata;
use serde::Serialize;

/// Tool name recorded in query metadata.
pub const TOOL_NAME: &str = "get_base_readQuery";

/// Column name and readable type label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl From<&ColumnMetadata> for ColumnDescriptor {
    fn from(column: &ColumnMetadata) -> Self {
        Self {
            name: column.name.clone(),
            type_name: column.native_type.display_name(),
        }
    }
}

/// Description of an executed query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMetadata {
    pub tool_name: String,
    pub sql: String,
    pub columns: Vec<ColumnDescriptor>,
    pub row_count: usize,
}

impl QueryMetadata {
    pub fn new(sql: impl Into<String>, columns: &[ColumnMetadata], row_count: usize) -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            sql: sql.into(),
            columns: columns.iter().map(ColumnDescriptor::from).collect(),
            row_count,
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a QueryMetadata>,
    results: &'a T,
}

/// Build a success envelope as compact JSON.
pub fn build<T: Serialize>(data: &T, metadata: Option<&QueryMetadata>) -> DbResult<String> {
    let envelope = Envelope {
        status: "success",
        metadata,
        results: data,
    };
    serde_json::to_string(&envelope)
        .map_err(|e| DbError::internal(format!("Failed to serialize response: {}", e)))
}

/// Render an error as the text returned to the client.
pub fn format_error_response(message: impl std::fmt::Display) -> String {
    format!("Error: {}", message)
}

/// Pretty-print text that is a JSON document; other text is returned as is.
pub fn format_text_response(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| text.to_string())
}
