//! Query execution engine.
//!
//! SQL text is executed verbatim on the open connection; nothing is
//! validated, rewritten or limited. The executor reports whether the
//! statement produced a result set at all, which is what separates a
//! zero-row SELECT from a DDL statement.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific describe and fetch
//! - `postgres`: PostgreSQL-specific describe and fetch
//! - `sqlite`: SQLite-specific describe and fetch
//!
//! Column metadata comes from preparing the statement. When the server cannot
//! prepare it (multi-statement text, commands outside the prepared protocol)
//! the metadata is taken from the first returned row instead.
//!
//! When the text holds several statements all of them run, but only the rows
//! of the first one are returned.

use crate::db::connection::DbConnection;
use crate::db::types::{RowDecode, type_of_value};
use crate::error::DbResult;
use crate::impl_db_dispatch;
use crate::models::{ColumnMetadata, DatabaseType, NativeType, NativeValue, ResultSet};
use futures_util::TryStreamExt;
use sqlx::{Column, Either, Row};
use std::time::Instant;
use tracing::debug;

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute SQL and return its result set, or `None` when the statement
    /// produced no result set.
    pub async fn execute(
        &self,
        conn: &mut DbConnection,
        sql: &str,
    ) -> DbResult<Option<ResultSet>> {
        let start = Instant::now();
        debug!(sql = %sql, db_type = %conn.db_type(), "Executing query");

        let result = impl_db_dispatch!(conn, {
            MySql(c) => mysql::run(c, sql).await?,
            Postgres(c) => postgres::run(c, sql).await?,
            SQLite(c) => sqlite::run(c, sql).await?,
        });

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            has_result_set = result.is_some(),
            rows = result.as_ref().map_or(0, ResultSet::row_count),
            "Query finished"
        );
        Ok(result)
    }
}

/// Build the result set from described columns and fetched rows.
fn assemble<R: RowDecode>(described: Option<Vec<ColumnMetadata>>, rows: Vec<R>) -> Option<ResultSet> {
    let mut columns = match described {
        Some(cols) if !cols.is_empty() => cols,
        // Prepared fine but has no output columns
        Some(_) if rows.is_empty() => return None,
        _ => rows.first()?.column_metadata(),
    };

    let rows: Vec<Vec<NativeValue>> = rows.iter().map(RowDecode::decode_values).collect();

    // Expression columns may have no declared type; use the first value
    for (idx, column) in columns.iter_mut().enumerate() {
        if column.native_type != NativeType::Null {
            continue;
        }
        if let Some(value) = rows
            .iter()
            .filter_map(|row| row.get(idx))
            .find(|value| !value.is_null())
        {
            column.native_type = type_of_value(value);
        }
    }

    Some(ResultSet { columns, rows })
}

/// Fetch the rows of the first statement, draining the rest of the stream.
///
/// Each statement ends with a result summary; rows after the first summary
/// (or with a different column layout) belong to later statements.
async fn fetch_first_result<'e, DB, E>(executor: E, sql: &'e str) -> DbResult<Vec<DB::Row>>
where
    DB: sqlx::Database,
    E: sqlx::Executor<'e, Database = DB>,
{
    let mut stream = executor.fetch_many(sql);
    let mut rows: Vec<DB::Row> = Vec::new();
    let mut first_done = false;
    let mut skipped = 0usize;

    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(_) => first_done = true,
            Either::Right(row) => {
                let same_layout = rows.first().is_none_or(|first| same_columns(first, &row));
                if !first_done && same_layout {
                    rows.push(row);
                } else {
                    first_done = true;
                    skipped += 1;
                }
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, "Dropped rows of later statements");
    }
    Ok(rows)
}

fn same_columns<R: Row>(a: &R, b: &R) -> bool {
    a.columns().len() == b.columns().len()
        && a.columns()
            .iter()
            .zip(b.columns())
            .all(|(x, y)| x.name() == y.name())
}

fn describe_columns<'a, C>(columns: impl IntoIterator<Item = &'a C>, db: DatabaseType) -> Vec<ColumnMetadata>
where
    C: sqlx::Column + 'a,
{
    use sqlx::TypeInfo;

    columns
        .into_iter()
        .map(|col| {
            ColumnMetadata::new(
                col.name(),
                NativeType::from_type_name(col.type_info().name(), db),
            )
        })
        .collect()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlConnection, MySqlRow};
    use sqlx::{Executor, Statement};

    pub async fn run(conn: &mut MySqlConnection, sql: &str) -> DbResult<Option<ResultSet>> {
        let described = match (&mut *conn).prepare(sql).await {
            Ok(stmt) => Some(describe_columns(stmt.columns(), DatabaseType::MySQL)),
            Err(e) => {
                debug!(error = %e, "Statement could not be described, using row metadata");
                None
            }
        };
        // Raw SQL goes over the text protocol so every type can be read back
        let rows: Vec<MySqlRow> = fetch_first_result(&mut *conn, sql).await?;
        Ok(assemble(described, rows))
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::{PgConnection, PgRow};
    use sqlx::{Executor, Statement};

    pub async fn run(conn: &mut PgConnection, sql: &str) -> DbResult<Option<ResultSet>> {
        let described = match (&mut *conn).prepare(sql).await {
            Ok(stmt) => Some(describe_columns(stmt.columns(), DatabaseType::PostgreSQL)),
            Err(e) => {
                debug!(error = %e, "Statement could not be described, using row metadata");
                None
            }
        };
        // Raw SQL uses the simple query protocol (text encoded results)
        let rows: Vec<PgRow> = fetch_first_result(&mut *conn, sql).await?;
        Ok(assemble(described, rows))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::{SqliteConnection, SqliteRow};
    use sqlx::{Executor, Statement};

    pub async fn run(conn: &mut SqliteConnection, sql: &str) -> DbResult<Option<ResultSet>> {
        let described = match (&mut *conn).prepare(sql).await {
            Ok(stmt) => Some(describe_columns(stmt.columns(), DatabaseType::SQLite)),
            Err(e) => {
                debug!(error = %e, "Statement could not be described, using row metadata");
                None
            }
        };
        let rows: Vec<SqliteRow> = fetch_first_result(&mut *conn, sql).await?;
        Ok(assemble(described, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteRow;

    #[test]
    fn test_no_columns_and_no_rows_is_no_result_set() {
        let rows: Vec<SqliteRow> = Vec::new();
        assert!(assemble(Some(Vec::new()), rows).is_none());

        let rows: Vec<SqliteRow> = Vec::new();
        assert!(assemble(None, rows).is_none());
    }

    #[test]
    fn test_described_columns_without_rows_is_empty_result_set() {
        let rows: Vec<SqliteRow> = Vec::new();
        let columns = vec![ColumnMetadata::new("id", NativeType::Integer)];
        let result = assemble(Some(columns.clone()), rows).unwrap();
        assert_eq!(result.columns, columns);
        assert_eq!(result.row_count(), 0);
    }
}
