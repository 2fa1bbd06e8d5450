//! Read-only inspection of the on-disk schema.
//!
//! Nothing here is cached: every call reads `sqlite_master` or a pragma, so
//! drift is always detected against the current state of the file.

use clientbook_core::quote_ident;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::ForeignKeyViolation;

pub(crate) const TABLE_EXISTS_SQL: &str =
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE LIMIT 1";
pub(crate) const OBJECT_EXISTS_SQL: &str =
    "SELECT 1 FROM sqlite_master WHERE name = ?1 COLLATE NOCASE LIMIT 1";
pub(crate) const TABLE_INFO_SQL: &str =
    "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid";
pub(crate) const FOREIGN_KEY_CHECK_SQL: &str = "PRAGMA foreign_key_check";

/// One column of an existing table, as reported by `PRAGMA table_info`.
///
/// Only `name` takes part in reconciliation; the remaining attributes are
/// informational and available to migration policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualColumn {
    /// Column name.
    pub name: String,
    /// Declared type text, empty when the column has none.
    pub declared_type: String,
    /// Whether the column is `NOT NULL`.
    pub not_null: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Default value expression text, if any.
    pub default_value: Option<String>,
}

/// Returns `true` if a table with this name exists.
///
/// Names are compared the way SQLite resolves identifiers, ignoring ASCII
/// case.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(TABLE_EXISTS_SQL, [table], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Returns `true` if any schema object (table, index, view or trigger) uses
/// this name.
pub fn object_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(OBJECT_EXISTS_SQL, [name], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Lists the columns of `table` in on-disk order.
///
/// Returns an empty list when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ActualColumn>> {
    let mut stmt = conn.prepare(TABLE_INFO_SQL)?;
    stmt.query_map([table], |row| {
        Ok(ActualColumn {
            name: row.get(0)?,
            declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            not_null: row.get::<_, i64>(2)? != 0,
            default_value: row.get(3)?,
            primary_key: row.get::<_, i64>(4)? > 0,
        })
    })?
    .collect()
}

/// Lists the names of all user tables, in name order. SQLite's internal
/// `sqlite_*` tables are excluded.
pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
    )?;
    stmt.query_map([], |row| row.get(0))?.collect()
}

pub(crate) fn row_count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(table))
}

/// Counts the rows of `table`.
pub fn row_count(conn: &Connection, table: &str) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row(&row_count_sql(table), [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

/// Runs `PRAGMA foreign_key_check` across the whole database.
///
/// The check works whether or not enforcement is currently enabled.
pub fn foreign_key_check(conn: &Connection) -> rusqlite::Result<Vec<ForeignKeyViolation>> {
    let mut stmt = conn.prepare(FOREIGN_KEY_CHECK_SQL)?;
    stmt.query_map([], |row| {
        Ok(ForeignKeyViolation {
            table: row.get(0)?,
            rowid: row.get(1)?,
            parent: row.get(2)?,
            constraint_index: row.get(3)?,
        })
    })?
    .collect()
}

/// Reads whether foreign-key enforcement is enabled on this connection.
pub fn foreign_keys_enabled(conn: &Connection) -> rusqlite::Result<bool> {
    conn.pragma_query_value(None, "foreign_keys", |row| row.get::<_, i64>(0))
        .map(|v| v != 0)
}
