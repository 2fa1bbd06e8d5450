//! Migration policies applied while rebuilding a table.
//!
//! A policy decides which shared columns are copied into the rebuilt table
//! and whether a newly introduced column is acceptable. The default,
//! [`CopySharedColumns`], copies everything and accepts everything.

use crate::error::{Result, SchemaError};
use crate::introspect::ActualColumn;

/// Hook consulted during rebuild-and-swap.
///
/// Both methods have permissive defaults, so an implementation only needs to
/// override the decision it cares about.
pub trait MigrationPolicy {
    /// Returns `true` to leave a shared column out of the copy. The column
    /// then takes its default in the rebuilt table.
    ///
    /// `column` describes the column as it exists in the old table.
    fn excludes_column(&self, table: &str, column: &ActualColumn) -> bool {
        let _ = (table, column);
        false
    }

    /// Vetoes introducing `column` into `table`.
    ///
    /// `column` describes the column as declared in the new table, and
    /// `source_rows` is the number of rows in the old table.
    fn check_added_column(
        &self,
        table: &str,
        column: &ActualColumn,
        source_rows: u64,
    ) -> Result<()> {
        let _ = (table, column, source_rows);
        Ok(())
    }
}

/// Copies every shared column and accepts every new column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopySharedColumns;

impl MigrationPolicy for CopySharedColumns {}

/// Rejects a rebuild that would leave existing rows without a value for a
/// required column.
///
/// A new column is unfillable when it is `NOT NULL`, has no default and is
/// not part of the primary key, while the old table holds at least one row.
/// Copying into such a table would fail with a constraint error anyway; this
/// policy reports it up front with the column name.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectUnfillableColumns;

impl MigrationPolicy for RejectUnfillableColumns {
    fn check_added_column(
        &self,
        table: &str,
        column: &ActualColumn,
        source_rows: u64,
    ) -> Result<()> {
        let unfillable = column.not_null && !column.primary_key && column.default_value.is_none();
        if unfillable && source_rows > 0 {
            return Err(SchemaError::SchemaMismatchUnresolvable {
                table: table.to_string(),
                column: column.name.clone(),
                reason: format!(
                    "NOT NULL column has no default and {source_rows} existing row(s) would have no value"
                ),
            });
        }
        Ok(())
    }
}
