//! Online schema reconciliation.
//!
//! [`Reconciler`] brings an existing database into conformance with a
//! [`DesiredSchema`]: missing tables are created, tables whose column
//! sequence has drifted are rebuilt under a temporary name and swapped into
//! place, and tables that already match are left alone. The whole pass runs
//! in one transaction and a database-wide foreign-key check gates the
//! commit, so a failed pass leaves the file exactly as it was.
//!
//! # Example
//!
//! ```no_run
//! use clientbook_sqlite::{client_catalog, reconcile_schema};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("clientsDatabase.db").unwrap();
//! let report = reconcile_schema(&mut conn, &client_catalog()).unwrap();
//! println!("{} created, {} rebuilt", report.created(), report.rebuilt());
//! ```
//!
//! # Foreign keys
//!
//! SQLite ignores `PRAGMA foreign_keys` while a transaction is open, so
//! enforcement is switched off before `BEGIN` and back on after the
//! transaction ends, whatever the outcome. With enforcement on, dropping a
//! rebuilt parent table would cascade into its children.
//! `PRAGMA foreign_key_check` reports violations regardless of the flag and
//! runs inside the transaction, after the last table.

use std::fmt;

use clientbook_core::{DesiredSchema, TableSpec, quote_ident, quote_ident_list, validate_catalog};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Result, SchemaError};
use crate::exec::{StatementContext, execute};
use crate::introspect::{
    self, ActualColumn, OBJECT_EXISTS_SQL, TABLE_EXISTS_SQL, TABLE_INFO_SQL, row_count_sql,
};
use crate::policy::{CopySharedColumns, MigrationPolicy};

/// Longest temporary table name the reconciler generates, in bytes.
pub const MAX_TEMP_NAME_BYTES: usize = 63;

/// Number of hex characters of a v4 UUID used to make temporary names unique.
const TEMP_TOKEN_LEN: usize = 12;

/// What happened to one table during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    /// The table did not exist and was created.
    Created,
    /// The on-disk column sequence already matched.
    Matching,
    /// The table was rebuilt and swapped into place.
    Rebuilt {
        /// Columns whose values were carried over, in expected order.
        copied_columns: Vec<String>,
        /// Columns that existed only in the old table.
        dropped_columns: Vec<String>,
        /// Columns that start from their declared default.
        added_columns: Vec<String>,
        /// Rows copied from the old table.
        rows_copied: u64,
    },
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Matching => f.write_str("matching"),
            Self::Rebuilt {
                copied_columns,
                dropped_columns,
                added_columns,
                rows_copied,
            } => write!(
                f,
                "rebuilt ({rows_copied} row(s) copied; kept {}; dropped {}; added {})",
                describe_columns(copied_columns),
                describe_columns(dropped_columns),
                describe_columns(added_columns),
            ),
        }
    }
}

/// Outcome of one table within a [`ReconcileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Catalog name of the table.
    pub table: String,
    /// What the pass did to it.
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

/// Per-table outcomes of a successful pass, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    tables: Vec<TableReport>,
}

impl ReconcileReport {
    fn push(&mut self, table: impl Into<String>, outcome: TableOutcome) {
        self.tables.push(TableReport {
            table: table.into(),
            outcome,
        });
    }

    /// All table outcomes, in catalog order.
    pub fn tables(&self) -> &[TableReport] {
        &self.tables
    }

    /// Outcome for a single table.
    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| &t.outcome)
    }

    /// Number of tables created.
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Created))
    }

    /// Number of tables rebuilt.
    pub fn rebuilt(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Rebuilt { .. }))
    }

    /// Number of tables that already matched.
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Matching))
    }

    /// Returns `true` if the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.unchanged() == self.tables.len()
    }

    fn count(&self, pred: impl Fn(&TableOutcome) -> bool) -> usize {
        self.tables.iter().filter(|t| pred(&t.outcome)).count()
    }
}

/// What a pass would do to one table, computed without writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TablePlan {
    /// The table is missing and would be created.
    Create,
    /// The table already matches.
    Keep,
    /// The table would be rebuilt.
    Rebuild {
        /// Columns that would be copied.
        shared: Vec<String>,
        /// Columns that would be discarded.
        dropped: Vec<String>,
        /// Columns that would start from their default.
        added: Vec<String>,
    },
}

impl fmt::Display for TablePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Keep => f.write_str("keep"),
            Self::Rebuild {
                shared,
                dropped,
                added,
            } => write!(
                f,
                "rebuild (keep {}; drop {}; add {})",
                describe_columns(shared),
                describe_columns(dropped),
                describe_columns(added),
            ),
        }
    }
}

/// Planned action for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedTable {
    /// Catalog name of the table.
    pub table: String,
    /// Action a pass would take.
    #[serde(flatten)]
    pub plan: TablePlan,
}

fn describe_columns(columns: &[String]) -> String {
    if columns.is_empty() {
        "none".to_string()
    } else {
        columns.join(", ")
    }
}

/// Brings the database into conformance with `schema` using the default
/// migration policy.
///
/// Equivalent to `Reconciler::new(schema).run(conn)`.
///
/// # Errors
///
/// Returns the first failure encountered; nothing has been committed when
/// this returns an error.
pub fn reconcile_schema(conn: &mut Connection, schema: &DesiredSchema) -> Result<ReconcileReport> {
    Reconciler::new(schema).run(conn)
}

/// Configurable reconciliation pass over a catalog.
///
/// # Examples
///
/// ```no_run
/// use clientbook_sqlite::{Reconciler, RejectUnfillableColumns, client_catalog};
/// use rusqlite::Connection;
///
/// let catalog = client_catalog();
/// let mut conn = Connection::open("clientsDatabase.db").unwrap();
///
/// let reconciler = Reconciler::new(&catalog).with_policy(RejectUnfillableColumns);
/// for planned in reconciler.plan(&conn).unwrap() {
///     println!("{}: {}", planned.table, planned.plan);
/// }
/// reconciler.run(&mut conn).unwrap();
/// ```
pub struct Reconciler<'a> {
    schema: &'a DesiredSchema,
    policy: Box<dyn MigrationPolicy + 'a>,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler for `schema` with [`CopySharedColumns`].
    pub fn new(schema: &'a DesiredSchema) -> Self {
        Self {
            schema,
            policy: Box::new(CopySharedColumns),
        }
    }

    /// Replaces the migration policy.
    pub fn with_policy(mut self, policy: impl MigrationPolicy + 'a) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Runs the pass.
    ///
    /// Foreign-key enforcement is off for the duration of the transaction
    /// and on again when this returns, on success and on failure.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InvalidCatalog`] before any SQL runs.
    /// - [`SchemaError::Statement`] naming the table whose step failed.
    /// - [`SchemaError::SchemaMismatchUnresolvable`] from the policy.
    /// - [`SchemaError::ForeignKeyViolation`] from the final check.
    /// - [`SchemaError::DatabaseError`] for transaction control and pragmas.
    pub fn run(&self, conn: &mut Connection) -> Result<ReconcileReport> {
        self.validate()?;
        info!(tables = self.schema.len(), "Starting schema reconciliation");

        set_foreign_keys(conn, false)?;
        let result = self.run_in_transaction(conn);
        let restored = set_foreign_keys(conn, true);

        let report = result?;
        restored?;
        info!(
            created = report.created(),
            rebuilt = report.rebuilt(),
            unchanged = report.unchanged(),
            "Schema reconciliation complete"
        );
        Ok(report)
    }

    /// Computes what [`run`](Self::run) would do, without writing.
    ///
    /// Policy exclusions are applied; policy vetoes on added columns are not,
    /// since they need the rebuilt table to exist.
    pub fn plan(&self, conn: &Connection) -> Result<Vec<PlannedTable>> {
        self.validate()?;
        let mut planned = Vec::with_capacity(self.schema.len());
        for spec in self.schema {
            let table = spec.name.as_str();
            let plan = if !introspect::table_exists(conn, table).in_table(table, TABLE_EXISTS_SQL)? {
                TablePlan::Create
            } else {
                let actual = introspect::table_columns(conn, table).in_table(table, TABLE_INFO_SQL)?;
                if matches_expected(spec, &actual) {
                    TablePlan::Keep
                } else {
                    let diff = diff_columns(self.policy.as_ref(), spec, &actual);
                    TablePlan::Rebuild {
                        shared: diff.copied_targets(),
                        dropped: diff.dropped,
                        added: diff.defaulted,
                    }
                }
            };
            planned.push(PlannedTable {
                table: spec.name.clone(),
                plan,
            });
        }
        Ok(planned)
    }

    fn validate(&self) -> Result<()> {
        let errors = validate_catalog(self.schema);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::InvalidCatalog(errors))
        }
    }

    fn run_in_transaction(&self, conn: &mut Connection) -> Result<ReconcileReport> {
        let tx = conn.transaction()?;
        let mut report = ReconcileReport::default();

        for spec in self.schema {
            let outcome = self.reconcile_table(&tx, spec)?;
            report.push(spec.name.as_str(), outcome);
        }

        let violations = introspect::foreign_key_check(&tx)?;
        if let Some(first) = violations.first() {
            error!(
                violations = violations.len(),
                first = %first,
                "Foreign key check failed; rolling back"
            );
            return Err(SchemaError::ForeignKeyViolation { violations });
        }

        tx.commit()?;
        Ok(report)
    }

    fn reconcile_table(&self, conn: &Connection, spec: &TableSpec) -> Result<TableOutcome> {
        let table = spec.name.as_str();

        if !introspect::table_exists(conn, table).in_table(table, TABLE_EXISTS_SQL)? {
            execute(conn, table, &spec.create_sql())?;
            info!(table, "Created table");
            return Ok(TableOutcome::Created);
        }

        let actual = introspect::table_columns(conn, table).in_table(table, TABLE_INFO_SQL)?;
        if matches_expected(spec, &actual) {
            debug!(table, "Table matches");
            return Ok(TableOutcome::Matching);
        }

        self.rebuild(conn, spec, &actual)
    }

    fn rebuild(
        &self,
        conn: &Connection,
        spec: &TableSpec,
        actual: &[ActualColumn],
    ) -> Result<TableOutcome> {
        let table = spec.name.as_str();
        let temp = temp_table_name(conn, table)?;
        execute(conn, table, &spec.create_sql_as(&temp))?;

        let diff = diff_columns(self.policy.as_ref(), spec, actual);

        if !diff.defaulted.is_empty() {
            let source_rows =
                introspect::row_count(conn, table).in_table(table, &row_count_sql(table))?;
            let new_columns =
                introspect::table_columns(conn, &temp).in_table(table, TABLE_INFO_SQL)?;
            let added = new_columns
                .iter()
                .filter(|c| diff.defaulted.iter().any(|d| d.eq_ignore_ascii_case(&c.name)));
            for column in added {
                self.policy.check_added_column(table, column, source_rows)?;
            }
        }

        let rows_copied = if diff.copied.is_empty() {
            0
        } else {
            let targets: Vec<&str> = diff.copied.iter().map(|(t, _)| t.as_str()).collect();
            let sources: Vec<&str> = diff.copied.iter().map(|(_, s)| s.as_str()).collect();
            let sql = format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                quote_ident(&temp),
                quote_ident_list(targets.as_slice()),
                quote_ident_list(sources.as_slice()),
                quote_ident(table),
            );
            execute(conn, table, &sql)? as u64
        };

        for column in &diff.dropped {
            warn!(table, column = column.as_str(), "Dropping column");
        }

        execute(conn, table, &format!("DROP TABLE {}", quote_ident(table)))?;
        execute(
            conn,
            table,
            &format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(&temp),
                quote_ident(table)
            ),
        )?;

        let copied_columns = diff.copied_targets();
        info!(
            table,
            rows_copied,
            copied = copied_columns.len(),
            dropped = diff.dropped.len(),
            added = diff.defaulted.len(),
            "Rebuilt table"
        );
        Ok(TableOutcome::Rebuilt {
            copied_columns,
            dropped_columns: diff.dropped,
            added_columns: diff.defaulted,
            rows_copied,
        })
    }
}

fn set_foreign_keys(conn: &Connection, enabled: bool) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", enabled)?;
    Ok(())
}

fn matches_expected(spec: &TableSpec, actual: &[ActualColumn]) -> bool {
    let names: Vec<&str> = actual.iter().map(|c| c.name.as_str()).collect();
    spec.matches_columns(names.as_slice())
}

/// How the columns of an old table map onto the expected ones.
#[derive(Debug, Default, PartialEq, Eq)]
struct ColumnDiff {
    /// `(expected name, on-disk name)` pairs, in expected order.
    copied: Vec<(String, String)>,
    /// On-disk columns with no expected counterpart.
    dropped: Vec<String>,
    /// Expected columns that receive no copied value.
    defaulted: Vec<String>,
}

impl ColumnDiff {
    fn copied_targets(&self) -> Vec<String> {
        self.copied.iter().map(|(target, _)| target.clone()).collect()
    }
}

/// Pairs expected columns with on-disk ones.
///
/// Names pair up ignoring ASCII case, since SQLite treats `Name` and `name`
/// as the same column. A shared column the policy excludes is reported as
/// defaulted.
fn diff_columns(
    policy: &dyn MigrationPolicy,
    spec: &TableSpec,
    actual: &[ActualColumn],
) -> ColumnDiff {
    let mut diff = ColumnDiff::default();

    for expected in &spec.expected_columns {
        match actual.iter().find(|c| c.name.eq_ignore_ascii_case(expected)) {
            Some(column) if !policy.excludes_column(&spec.name, column) => {
                diff.copied.push((expected.clone(), column.name.clone()));
            }
            Some(column) => {
                debug!(
                    table = spec.name.as_str(),
                    column = column.name.as_str(),
                    "Column excluded by policy"
                );
                diff.defaulted.push(expected.clone());
            }
            None => diff.defaulted.push(expected.clone()),
        }
    }

    diff.dropped = actual
        .iter()
        .filter(|c| {
            !spec
                .expected_columns
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&c.name))
        })
        .map(|c| c.name.clone())
        .collect();

    diff
}

/// Builds a temporary name from a table name and a unique token.
///
/// The table stem is shortened on a character boundary so the result never
/// exceeds [`MAX_TEMP_NAME_BYTES`].
fn temp_name_candidate(table: &str, token: &str) -> String {
    let budget = MAX_TEMP_NAME_BYTES.saturating_sub("_".len() + "_new_".len() + token.len());
    let mut end = table.len().min(budget);
    while !table.is_char_boundary(end) {
        end -= 1;
    }
    format!("_{}_new_{token}", &table[..end])
}

/// Picks a temporary name no existing schema object uses.
fn temp_table_name(conn: &Connection, table: &str) -> Result<String> {
    loop {
        let uuid = Uuid::new_v4().simple().to_string();
        let candidate = temp_name_candidate(table, &uuid[..TEMP_TOKEN_LEN]);
        if !introspect::object_exists(conn, &candidate).in_table(table, OBJECT_EXISTS_SQL)? {
            return Ok(candidate);
        }
        debug!(table, candidate = candidate.as_str(), "Temporary name taken; retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RejectUnfillableColumns;
    use clientbook_core::TableDef;

    fn actual(names: &[&str]) -> Vec<ActualColumn> {
        names
            .iter()
            .map(|name| ActualColumn {
                name: name.to_string(),
                declared_type: String::new(),
                not_null: false,
                primary_key: false,
                default_value: None,
            })
            .collect()
    }

    fn spec(columns: &[&str]) -> TableSpec {
        columns
            .iter()
            .fold(TableDef::new("t"), |def, c| def.column(*c, "TEXT"))
            .build()
    }

    struct ExcludeId;

    impl MigrationPolicy for ExcludeId {
        fn excludes_column(&self, _table: &str, column: &ActualColumn) -> bool {
            column.name == "id"
        }
    }

    #[test]
    fn test_diff_superset() {
        let diff = diff_columns(&CopySharedColumns, &spec(&["a", "b", "c"]), &actual(&["a", "b"]));
        assert_eq!(diff.copied_targets(), vec!["a", "b"]);
        assert!(diff.dropped.is_empty());
        assert_eq!(diff.defaulted, vec!["c"]);
    }

    #[test]
    fn test_diff_subset_and_reorder() {
        let diff = diff_columns(&CopySharedColumns, &spec(&["c", "a"]), &actual(&["a", "b", "c"]));
        assert_eq!(diff.copied_targets(), vec!["c", "a"]);
        assert_eq!(diff.dropped, vec!["b"]);
        assert!(diff.defaulted.is_empty());
    }

    #[test]
    fn test_diff_pairs_names_ignoring_case() {
        let diff = diff_columns(&CopySharedColumns, &spec(&["Name"]), &actual(&["name"]));
        assert_eq!(diff.copied, vec![("Name".to_string(), "name".to_string())]);
        assert!(diff.dropped.is_empty());
    }

    #[test]
    fn test_diff_policy_exclusion_defaults_column() {
        let diff = diff_columns(&ExcludeId, &spec(&["id", "x"]), &actual(&["id", "y"]));
        assert_eq!(diff.copied_targets(), Vec::<String>::new());
        assert_eq!(diff.defaulted, vec!["id", "x"]);
        assert_eq!(diff.dropped, vec!["y"]);
    }

    #[test]
    fn test_temp_name_shape() {
        let name = temp_name_candidate("Users", "0123456789ab");
        assert_eq!(name, "_Users_new_0123456789ab");
    }

    #[test]
    fn test_temp_name_truncates_long_tables() {
        let long = "x".repeat(200);
        let name = temp_name_candidate(&long, "0123456789ab");
        assert_eq!(name.len(), MAX_TEMP_NAME_BYTES);
        assert!(name.ends_with("_new_0123456789ab"));
    }

    #[test]
    fn test_temp_name_truncates_on_char_boundary() {
        let long = "é".repeat(40);
        let name = temp_name_candidate(&long, "0123456789ab");
        assert!(name.len() <= MAX_TEMP_NAME_BYTES);
        assert!(name.ends_with("_new_0123456789ab"));
    }

    #[test]
    fn test_temp_table_name_is_fresh() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Users (id INTEGER)").unwrap();
        let a = temp_table_name(&conn, "Users").unwrap();
        let b = temp_table_name(&conn, "Users").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("_Users_new_"));
        assert_eq!(a.len(), "_Users_new_".len() + TEMP_TOKEN_LEN);
    }

    #[test]
    fn test_report_counters() {
        let mut report = ReconcileReport::default();
        report.push("a", TableOutcome::Matching);
        assert!(report.is_noop());
        report.push("b", TableOutcome::Created);
        report.push(
            "c",
            TableOutcome::Rebuilt {
                copied_columns: vec!["x".to_string()],
                dropped_columns: vec![],
                added_columns: vec![],
                rows_copied: 2,
            },
        );
        assert_eq!(report.created(), 1);
        assert_eq!(report.rebuilt(), 1);
        assert_eq!(report.unchanged(), 1);
        assert!(!report.is_noop());
        assert_eq!(report.outcome("b"), Some(&TableOutcome::Created));
        assert_eq!(report.outcome("zzz"), None);
    }

    #[test]
    fn test_outcome_display() {
        let outcome = TableOutcome::Rebuilt {
            copied_columns: vec!["id".to_string(), "name".to_string()],
            dropped_columns: vec![],
            added_columns: vec!["email".to_string()],
            rows_copied: 3,
        };
        assert_eq!(
            outcome.to_string(),
            "rebuilt (3 row(s) copied; kept id, name; dropped none; added email)"
        );
        assert_eq!(TableOutcome::Created.to_string(), "created");
    }

    #[test]
    fn test_plan_does_not_check_added_columns() {
        let catalog = DesiredSchema::new().with_table(
            TableDef::new("t")
                .column("a", "TEXT")
                .column("b", "TEXT NOT NULL")
                .build(),
        );
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a TEXT); INSERT INTO t VALUES ('x');")
            .unwrap();

        let planned = Reconciler::new(&catalog)
            .with_policy(RejectUnfillableColumns)
            .plan(&conn)
            .unwrap();
        assert_eq!(
            planned[0].plan,
            TablePlan::Rebuild {
                shared: vec!["a".to_string()],
                dropped: vec![],
                added: vec!["b".to_string()],
            }
        );
    }
}
