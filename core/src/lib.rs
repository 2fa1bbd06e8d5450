//! Declarative table catalogs for schema reconciliation.
//!
//! This crate defines what a database is supposed to look like, independent
//! of any connection:
//!
//! - [`DesiredSchema`]: ordered catalog of tables; parents come before the
//!   children that reference them.
//! - [`TableSpec`]: one table, a [`CreateTemplate`] plus the column names the
//!   table is expected to have, in order.
//! - [`TableDef`]: builder that derives a [`TableSpec`]'s template and column
//!   list from a single column declaration list.
//! - [`quote_ident`]: the only way identifiers enter SQL text.
//!
//! Validation ([`validate_catalog`]) catches duplicate tables, empty column
//! lists and templates without a table placeholder.
//!
//! # Example
//!
//! ```
//! use clientbook_core::*;
//!
//! let schema = DesiredSchema::new()
//!     .with_table(
//!         TableDef::new("Users")
//!             .column("id", "INTEGER PRIMARY KEY")
//!             .column("name", "TEXT")
//!             .build(),
//!     )
//!     .with_table(
//!         TableDef::new("Orders")
//!             .column("id", "INTEGER PRIMARY KEY")
//!             .column("userId", "INTEGER")
//!             .column("total", "REAL")
//!             .foreign_key("userId", "Users", "id", ForeignKeyAction::Cascade)
//!             .build(),
//!     );
//!
//! assert!(validate_catalog(&schema).is_empty());
//! assert_eq!(schema.get("Orders").unwrap().expected_columns, ["id", "userId", "total"]);
//! ```

mod builder;
mod ident;
mod types;
mod validate;

pub use builder::{ForeignKeyAction, TableDef};
pub use ident::{quote_ident, quote_ident_list};
pub use types::*;
pub use validate::{CatalogError, validate_catalog, validate_table};
