//! SQLite schema reconciliation and client registry storage.
//!
//! This crate brings a live SQLite database into conformance with a
//! [`DesiredSchema`](clientbook_core::DesiredSchema) and then serves the
//! client registry's records from it.
//!
//! # Architecture
//!
//! - **`introspect`**: read-only view of `sqlite_master` and table pragmas
//! - **`reconcile`**: create, keep or rebuild-and-swap every catalog table in
//!   one transaction, gated by a foreign-key check
//! - **`policy`**: hooks that shape a rebuild
//! - **`catalog`**: the registry's tables
//! - **`query`**: [`ClientStore`] CRUD over the reconciled tables
//!
//! # Quick start
//!
//! ```no_run
//! use clientbook_sqlite::{ClientStore, client_catalog, reconcile_schema};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("clientsDatabase.db").unwrap();
//! let report = reconcile_schema(&mut conn, &client_catalog()).unwrap();
//! for table in report.tables() {
//!     println!("{}: {}", table.table, table.outcome);
//! }
//!
//! let store = ClientStore::new(&conn).unwrap();
//! println!("{} users", store.all_users().unwrap().len());
//! ```
//!
//! # Atomicity
//!
//! A pass either commits every table change or none. After any pass,
//! successful or not, foreign-key enforcement is on for the connection.

pub mod catalog;
mod convert;
mod error;
mod exec;
pub mod introspect;
mod models;
mod policy;
mod query;
mod reconcile;

pub use catalog::client_catalog;
pub use error::{ForeignKeyViolation, Result, SchemaError};
pub use introspect::ActualColumn;
pub use models::{
    Address, Machine, MachineUpdate, NewMachine, NewPurchaseItem, NewRepair, NewUser,
    PurchaseHistoryEntry, Repair, RepairUpdate, User, UserUpdate,
};
pub use policy::{CopySharedColumns, MigrationPolicy, RejectUnfillableColumns};
pub use query::ClientStore;
pub use reconcile::{
    MAX_TEMP_NAME_BYTES, PlannedTable, ReconcileReport, Reconciler, TableOutcome, TablePlan,
    TableReport, reconcile_schema,
};
