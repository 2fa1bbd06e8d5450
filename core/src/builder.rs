//! Builder for [`TableSpec`] entries.
//!
//! Writing a creation template and its expected column list by hand leaves
//! room for the two to disagree. [`TableDef`] declares each column once and
//! derives both from the same list. Every identifier it emits (table, columns,
//! referenced tables and columns) goes through [`quote_ident`]; column
//! declarations and table constraints are fixed SQL fragments supplied by the
//! catalog author.

use std::fmt;

use crate::ident::{quote_ident, quote_ident_list};
use crate::types::{CreateTemplate, TABLE_PLACEHOLDER, TableSpec};

/// Action taken on child rows when a referenced parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyAction {
    /// `ON DELETE NO ACTION` (SQLite's default, so nothing is emitted).
    #[default]
    NoAction,
    /// `ON DELETE CASCADE`
    Cascade,
    /// `ON DELETE SET NULL`
    SetNull,
    /// `ON DELETE RESTRICT`
    Restrict,
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction => f.write_str("NO ACTION"),
            Self::Cascade => f.write_str("CASCADE"),
            Self::SetNull => f.write_str("SET NULL"),
            Self::Restrict => f.write_str("RESTRICT"),
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnDef {
    name: String,
    declaration: String,
}

#[derive(Debug, Clone)]
struct ForeignKeyDef {
    columns: Vec<String>,
    parent_table: String,
    parent_columns: Vec<String>,
    on_delete: ForeignKeyAction,
}

/// Declarative table definition that builds a [`TableSpec`].
///
/// # Examples
///
/// ```
/// use clientbook_core::{ForeignKeyAction, TableDef};
///
/// let orders = TableDef::new("Orders")
///     .column("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
///     .column("userId", "INTEGER")
///     .column("total", "REAL DEFAULT 0")
///     .foreign_key("userId", "Users", "id", ForeignKeyAction::Cascade)
///     .build();
///
/// assert_eq!(orders.expected_columns, vec!["id", "userId", "total"]);
/// let sql = orders.create_sql();
/// assert!(sql.starts_with(r#"CREATE TABLE IF NOT EXISTS "Orders" ("#));
/// assert!(sql.contains(r#"FOREIGN KEY ("userId") REFERENCES "Users" ("id") ON DELETE CASCADE"#));
/// ```
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    foreign_keys: Vec<ForeignKeyDef>,
    checks: Vec<String>,
}

impl TableDef {
    /// Starts a definition for the named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Adds a column. `declaration` is the type and column constraints, e.g.
    /// `"INTEGER PRIMARY KEY AUTOINCREMENT"` or `"REAL DEFAULT 0"`.
    pub fn column(mut self, name: impl Into<String>, declaration: impl Into<String>) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            declaration: declaration.into(),
        });
        self
    }

    /// Adds a single-column foreign key.
    pub fn foreign_key(
        self,
        column: impl Into<String>,
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
        on_delete: ForeignKeyAction,
    ) -> Self {
        let column: String = column.into();
        let parent_column: String = parent_column.into();
        self.composite_foreign_key([column], parent_table, [parent_column], on_delete)
    }

    /// Adds a multi-column foreign key.
    pub fn composite_foreign_key<I, J>(
        mut self,
        columns: I,
        parent_table: impl Into<String>,
        parent_columns: J,
        on_delete: ForeignKeyAction,
    ) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        self.foreign_keys.push(ForeignKeyDef {
            columns: columns.into_iter().collect(),
            parent_table: parent_table.into(),
            parent_columns: parent_columns.into_iter().collect(),
            on_delete,
        });
        self
    }

    /// Adds a table-level `CHECK (...)` constraint.
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.checks.push(expression.into());
        self
    }

    /// Renders the creation template and expected column list.
    pub fn build(self) -> TableSpec {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.declaration.is_empty() {
                    quote_ident(&c.name)
                } else {
                    format!("{} {}", quote_ident(&c.name), c.declaration)
                }
            })
            .collect();

        for check in &self.checks {
            lines.push(format!("CHECK ({check})"));
        }

        for fk in &self.foreign_keys {
            let mut line = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident_list(&fk.columns),
                quote_ident(&fk.parent_table),
                quote_ident_list(&fk.parent_columns),
            );
            if fk.on_delete != ForeignKeyAction::NoAction {
                line.push_str(&format!(" ON DELETE {}", fk.on_delete));
            }
            lines.push(line);
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_PLACEHOLDER} (\n    {}\n)",
            lines.join(",\n    ")
        );

        TableSpec {
            name: self.name,
            create_template: CreateTemplate::new(sql),
            expected_columns: self.columns.into_iter().map(|c| c.name).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_column_order_follows_declaration() {
        let spec = TableDef::new("Machines")
            .column("internalId", "INTEGER PRIMARY KEY AUTOINCREMENT")
            .column("machineId", "TEXT")
            .column("ownerPhone2", "TEXT")
            .build();
        assert_eq!(spec.name, "Machines");
        assert_eq!(spec.expected_columns, vec!["internalId", "machineId", "ownerPhone2"]);
    }

    #[test]
    fn test_build_template_has_placeholder() {
        let spec = TableDef::new("T").column("a", "TEXT").build();
        assert!(spec.create_template.has_placeholder());
        assert_eq!(
            spec.create_sql(),
            "CREATE TABLE IF NOT EXISTS \"T\" (\n    \"a\" TEXT\n)"
        );
    }

    #[test]
    fn test_build_bare_column_without_declaration() {
        let spec = TableDef::new("T").column("a", "").column("b", "INTEGER").build();
        assert_eq!(
            spec.create_sql(),
            "CREATE TABLE IF NOT EXISTS \"T\" (\n    \"a\",\n    \"b\" INTEGER\n)"
        );
    }

    #[test]
    fn test_no_action_is_not_emitted() {
        let spec = TableDef::new("Child")
            .column("parentId", "INTEGER")
            .foreign_key("parentId", "Parent", "id", ForeignKeyAction::NoAction)
            .build();
        let sql = spec.create_sql();
        assert!(sql.contains("REFERENCES \"Parent\" (\"id\")"));
        assert!(!sql.contains("ON DELETE"));
    }

    #[test]
    fn test_check_and_foreign_key_after_columns() {
        let spec = TableDef::new("Items")
            .column("qty", "INTEGER")
            .column("orderId", "INTEGER")
            .check("qty >= 0")
            .foreign_key("orderId", "Orders", "id", ForeignKeyAction::SetNull)
            .build();
        let sql = spec.create_sql();
        let check_at = sql.find("CHECK (qty >= 0)").unwrap();
        let fk_at = sql.find("FOREIGN KEY").unwrap();
        let last_col = sql.find("\"orderId\" INTEGER").unwrap();
        assert!(last_col < check_at && check_at < fk_at);
        assert!(sql.contains("ON DELETE SET NULL"));
        // Constraints are not columns.
        assert_eq!(spec.expected_columns, vec!["qty", "orderId"]);
    }

    #[test]
    fn test_composite_foreign_key() {
        let spec = TableDef::new("Link")
            .column("a", "INTEGER")
            .column("b", "INTEGER")
            .composite_foreign_key(
                ["a".to_string(), "b".to_string()],
                "Pair",
                ["x".to_string(), "y".to_string()],
                ForeignKeyAction::Restrict,
            )
            .build();
        assert!(spec.create_sql().contains(
            "FOREIGN KEY (\"a\", \"b\") REFERENCES \"Pair\" (\"x\", \"y\") ON DELETE RESTRICT"
        ));
    }

    #[test]
    fn test_built_sql_is_valid_for_temporary_names() {
        let spec = TableDef::new("Users").column("id", "INTEGER").build();
        let tmp = spec.create_sql_as("_Users_new_0123456789ab");
        assert!(tmp.contains("\"_Users_new_0123456789ab\""));
        assert!(!tmp.contains("\"Users\""));
    }
}
