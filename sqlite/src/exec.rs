//! Statement execution with per-table error attribution.
//!
//! Every statement the reconciler issues goes through [`execute`], which logs
//! it and tags a failure with the table being reconciled.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Attaches the table being reconciled to a raw SQLite result.
pub(crate) trait StatementContext<T> {
    /// Converts an error into [`SchemaError::Statement`] for `table`.
    fn in_table(self, table: &str, statement: &str) -> Result<T>;
}

impl<T> StatementContext<T> for rusqlite::Result<T> {
    fn in_table(self, table: &str, statement: &str) -> Result<T> {
        self.map_err(|source| SchemaError::Statement {
            table: table.to_string(),
            statement: statement.to_string(),
            source,
        })
    }
}

/// Runs a single statement that returns no rows and reports the number of
/// rows it changed.
pub(crate) fn execute(conn: &Connection, table: &str, sql: &str) -> Result<usize> {
    debug!(table, sql, "Executing statement");
    conn.execute(sql, []).in_table(table, sql)
}
