//! Desired-schema catalog types.
//!
//! A [`DesiredSchema`] is an ordered list of [`TableSpec`] entries. Each entry
//! pairs a creation statement template with the column names the table is
//! expected to have, in on-disk order. The types are plain data and
//! round-trip through JSON and YAML with [`serde`].

use serde::{Deserialize, Serialize};

use crate::ident::quote_ident;

/// Placeholder substituted with the quoted table name when a
/// [`CreateTemplate`] is rendered.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// A `CREATE TABLE` statement with the table name left open.
///
/// The template text contains one or more [`TABLE_PLACEHOLDER`] markers.
/// [`render`](CreateTemplate::render) replaces each with the quoted form of
/// the supplied name, so the same template can create the real table or a
/// temporary copy of it. Nothing other than a quoted identifier is ever
/// substituted into the SQL text.
///
/// # Examples
///
/// ```
/// use clientbook_core::CreateTemplate;
///
/// let template = CreateTemplate::new("CREATE TABLE IF NOT EXISTS {table} (id INTEGER)");
/// assert_eq!(
///     template.render("Users"),
///     r#"CREATE TABLE IF NOT EXISTS "Users" (id INTEGER)"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateTemplate(String);

impl CreateTemplate {
    /// Wraps raw template text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the raw template text, placeholders included.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the template mentions [`TABLE_PLACEHOLDER`].
    pub fn has_placeholder(&self) -> bool {
        self.0.contains(TABLE_PLACEHOLDER)
    }

    /// Renders the statement for `table`, quoting the name.
    pub fn render(&self, table: &str) -> String {
        self.0.replace(TABLE_PLACEHOLDER, &quote_ident(table))
    }
}

/// One entry of a [`DesiredSchema`].
///
/// `expected_columns` lists column names in the order the creation statement
/// declares them. The reconciler compares this sequence, and nothing else,
/// against the table on disk.
///
/// # Examples
///
/// ```
/// use clientbook_core::{CreateTemplate, TableSpec};
///
/// let spec = TableSpec::new(
///     "Users",
///     CreateTemplate::new("CREATE TABLE {table} (id INTEGER PRIMARY KEY, name TEXT)"),
///     ["id", "name"],
/// );
/// assert_eq!(spec.expected_columns, vec!["id", "name"]);
/// assert!(spec.create_sql().contains(r#""Users""#));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name as it appears in `sqlite_master`.
    pub name: String,
    /// Creation statement with the table name left open.
    pub create_template: CreateTemplate,
    /// Expected column names, in declaration order.
    pub expected_columns: Vec<String>,
}

impl TableSpec {
    /// Creates a table entry.
    pub fn new<I, S>(name: impl Into<String>, create_template: CreateTemplate, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            create_template,
            expected_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the creation statement for the table's own name.
    pub fn create_sql(&self) -> String {
        self.create_template.render(&self.name)
    }

    /// Renders the creation statement under another name (used for the
    /// temporary table of a rebuild).
    pub fn create_sql_as(&self, table: &str) -> String {
        self.create_template.render(table)
    }

    /// Returns `true` if `columns` equals the expected sequence exactly:
    /// same names, same order, same count.
    pub fn matches_columns<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        self.expected_columns.len() == columns.len()
            && self
                .expected_columns
                .iter()
                .zip(columns)
                .all(|(expected, actual)| expected == actual.as_ref())
    }
}

/// Ordered catalog of tables the database must contain.
///
/// Order is significant: tables are reconciled in the order they were added,
/// so parents must come before the children that reference them.
///
/// # Examples
///
/// ```
/// use clientbook_core::{DesiredSchema, TableDef};
///
/// let schema = DesiredSchema::new()
///     .with_table(TableDef::new("Users").column("id", "INTEGER PRIMARY KEY").build())
///     .with_table(TableDef::new("Notes").column("id", "INTEGER PRIMARY KEY").build());
///
/// assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["Users", "Notes"]);
/// assert!(schema.get("Notes").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSchema {
    /// Table entries, in reconciliation order.
    pub tables: Vec<TableSpec>,
}

impl DesiredSchema {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a table and returns the catalog.
    pub fn with_table(mut self, table: TableSpec) -> Self {
        self.tables.push(table);
        self
    }

    /// Appends a table.
    pub fn push(&mut self, table: TableSpec) {
        self.tables.push(table);
    }

    /// Looks up a table entry by exact name.
    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Iterates over table entries in reconciliation order.
    pub fn iter(&self) -> std::slice::Iter<'_, TableSpec> {
        self.tables.iter()
    }

    /// Iterates over table names in reconciliation order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Number of tables in the catalog.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the catalog has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableSpec> for DesiredSchema {
    fn from_iter<I: IntoIterator<Item = TableSpec>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DesiredSchema {
    type Item = &'a TableSpec;
    type IntoIter = std::slice::Iter<'a, TableSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}
