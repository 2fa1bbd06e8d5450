//! Error types for reconciliation and record operations.
//!
//! A reconciliation pass either succeeds completely or returns exactly one
//! [`SchemaError`]; the transaction has already been rolled back by the time
//! the caller sees it.

use std::fmt;

use clientbook_core::CatalogError;
use serde::Serialize;
use thiserror::Error;

/// One row reported by `PRAGMA foreign_key_check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyViolation {
    /// Child table holding the offending row.
    pub table: String,
    /// Rowid of the offending row (`None` for `WITHOUT ROWID` tables).
    pub rowid: Option<i64>,
    /// Parent table the row fails to reference.
    pub parent: String,
    /// Index of the violated constraint in `PRAGMA foreign_key_list(table)`.
    pub constraint_index: i64,
}

impl fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rowid {
            Some(rowid) => write!(f, "{} row {rowid}", self.table)?,
            None => write!(f, "{} (without rowid)", self.table)?,
        }
        write!(
            f,
            " references a missing {} row (foreign key #{})",
            self.parent, self.constraint_index
        )
    }
}

/// Errors that can occur during reconciliation and record operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A statement issued while reconciling `table` failed.
    #[error("statement failed while reconciling table {table}: {source}")]
    Statement {
        /// Table being reconciled when the statement failed.
        table: String,
        /// SQL text of the failing statement.
        statement: String,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// The whole-database foreign-key check found orphaned rows.
    #[error(
        "foreign key violation after reconciliation: {} ({} violation(s))",
        first_violation(.violations),
        .violations.len()
    )]
    ForeignKeyViolation {
        /// Every row `PRAGMA foreign_key_check` reported.
        violations: Vec<ForeignKeyViolation>,
    },

    /// A migration policy refused to introduce a column.
    #[error("cannot introduce column {column} on table {table}: {reason}")]
    SchemaMismatchUnresolvable {
        /// Table being rebuilt.
        table: String,
        /// Column the policy rejected.
        column: String,
        /// Why the column cannot be introduced.
        reason: String,
    },

    /// The catalog failed validation; no statement was issued.
    #[error("invalid catalog: {}", join_catalog_errors(.0))]
    InvalidCatalog(Vec<CatalogError>),

    /// SQLite failure outside a per-table step (transaction control, pragmas,
    /// record operations).
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A record operation targeted a row that does not exist.
    #[error("{entity} {id} not found")]
    RecordNotFound {
        /// Kind of record, e.g. `"user"`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: i64,
    },
}

impl SchemaError {
    /// Name of the table the error is attributed to, when there is one.
    ///
    /// For foreign-key violations this is the child table of the first
    /// reported row.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Statement { table, .. } | Self::SchemaMismatchUnresolvable { table, .. } => {
                Some(table.as_str())
            }
            Self::ForeignKeyViolation { violations } => violations.first().map(|v| v.table.as_str()),
            _ => None,
        }
    }
}

fn first_violation(violations: &[ForeignKeyViolation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no details".to_string())
}

fn join_catalog_errors(errors: &[CatalogError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let v = ForeignKeyViolation {
            table: "Orders".to_string(),
            rowid: Some(7),
            parent: "Users".to_string(),
            constraint_index: 0,
        };
        assert_eq!(
            v.to_string(),
            "Orders row 7 references a missing Users row (foreign key #0)"
        );
    }

    #[test]
    fn test_error_names_first_violation() {
        let err = SchemaError::ForeignKeyViolation {
            violations: vec![
                ForeignKeyViolation {
                    table: "Orders".to_string(),
                    rowid: Some(1),
                    parent: "Users".to_string(),
                    constraint_index: 0,
                },
                ForeignKeyViolation {
                    table: "Items".to_string(),
                    rowid: None,
                    parent: "Orders".to_string(),
                    constraint_index: 1,
                },
            ],
        };
        assert_eq!(err.table(), Some("Orders"));
        let message = err.to_string();
        assert!(message.contains("Orders row 1"));
        assert!(message.contains("2 violation(s)"));
    }

    #[test]
    fn test_invalid_catalog_message_lists_all() {
        let err = SchemaError::InvalidCatalog(vec![
            CatalogError::EmptyCatalog,
            CatalogError::NoColumns("T".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid catalog: catalog has no tables; table T has no expected columns"
        );
        assert_eq!(err.table(), None);
    }
}
