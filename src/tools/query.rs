//! Read query tool.
//!
//! This module implements the `execute_read_query` MCP tool. The SQL text is
//! passed to the database verbatim; the result set, if any, is returned in
//! the success envelope with column metadata.

use crate::db::{ConnectionManager, QueryExecutor};
use crate::error::DbResult;
use crate::tools::envelope::{self, QueryMetadata};
use crate::tools::serializer::rows_to_json;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the read query tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ReadQueryInput {
    /// SQL statement to run against the database, executed as given
    #[serde(default)]
    pub sql: String,
}

/// Handler for the read query tool.
pub struct QueryToolHandler {
    connection_manager: Arc<ConnectionManager>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            executor: QueryExecutor::new(),
        }
    }

    /// Execute the SQL and render the success envelope.
    ///
    /// The connection stays locked until the rows have been fetched.
    pub async fn run(&self, sql: &str) -> DbResult<String> {
        info!(sql_len = sql.len(), "Tool: execute_read_query");

        let result = {
            let mut conn = self.connection_manager.acquire().await?;
            self.executor.execute(&mut conn, sql).await?
        };

        match result {
            Some(result_set) => {
                let metadata =
                    QueryMetadata::new(sql, &result_set.columns, result_set.row_count());
                let rows = rows_to_json(&result_set.columns, &result_set.rows);
                envelope::build(&rows, Some(&metadata))
            }
            None => {
                let rows: Vec<serde_json::Value> = Vec::new();
                envelope::build(&rows, None)
            }
        }
    }
}
