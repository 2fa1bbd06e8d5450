//! Catalog validation.
//!
//! Catches catalog mistakes (duplicate tables, empty column lists, templates
//! that forget the table placeholder) before any statement reaches the
//! database. SQLite resolves table and column names case-insensitively, so
//! duplicates are detected the same way.
//!
//! # Examples
//!
//! ```
//! use clientbook_core::*;
//!
//! let schema = DesiredSchema::new()
//!     .with_table(TableDef::new("Users").column("id", "INTEGER").build());
//! assert!(validate_catalog(&schema).is_empty());
//!
//! // Same table twice, differing only by case
//! let schema = schema.with_table(TableDef::new("USERS").column("id", "INTEGER").build());
//! let errors = validate_catalog(&schema);
//! assert!(errors.iter().any(|e| matches!(e, CatalogError::DuplicateTable(_))));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{DesiredSchema, TableSpec};

/// Catalog validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog lists no tables.
    #[error("catalog has no tables")]
    EmptyCatalog,
    /// A table name is empty or whitespace-only.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// Two entries name the same table.
    #[error("duplicate table in catalog: {0}")]
    DuplicateTable(String),
    /// A table expects no columns.
    #[error("table {0} has no expected columns")]
    NoColumns(String),
    /// An expected column name is empty.
    #[error("table {0} has an empty column name")]
    EmptyColumnName(String),
    /// A column is listed twice for the same table.
    #[error("table {table} lists column {column} more than once")]
    DuplicateColumn {
        /// Table the column belongs to.
        table: String,
        /// The repeated column name.
        column: String,
    },
    /// The creation template never mentions the table placeholder, so it
    /// cannot be rendered for a temporary name.
    #[error("create template for table {0} has no {{table}} placeholder")]
    MissingPlaceholder(String),
}

/// Validates a whole catalog and returns every problem found.
///
/// An empty result means the catalog is usable.
pub fn validate_catalog(schema: &DesiredSchema) -> Vec<CatalogError> {
    let mut errors = Vec::new();

    if schema.is_empty() {
        errors.push(CatalogError::EmptyCatalog);
        return errors;
    }

    let mut seen_tables: HashSet<String> = HashSet::new();
    for table in schema {
        if table.name.trim().is_empty() {
            errors.push(CatalogError::EmptyTableName);
            continue;
        }
        if !seen_tables.insert(table.name.to_lowercase()) {
            errors.push(CatalogError::DuplicateTable(table.name.clone()));
        }
        errors.extend(validate_table(table));
    }

    errors
}

/// Validates a single catalog entry.
pub fn validate_table(table: &TableSpec) -> Vec<CatalogError> {
    let mut errors = Vec::new();

    if !table.create_template.has_placeholder() {
        errors.push(CatalogError::MissingPlaceholder(table.name.clone()));
    }

    if table.expected_columns.is_empty() {
        errors.push(CatalogError::NoColumns(table.name.clone()));
        return errors;
    }

    let mut seen_columns: HashSet<String> = HashSet::new();
    for column in &table.expected_columns {
        if column.trim().is_empty() {
            errors.push(CatalogError::EmptyColumnName(table.name.clone()));
            continue;
        }
        if !seen_columns.insert(column.to_lowercase()) {
            errors.push(CatalogError::DuplicateColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }
    }

    errors
}
