//! Schema reconciliation walkthrough.
//!
//! Starts from an outdated `Users` table, plans the pass, runs it, and shows
//! that a second pass changes nothing.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p clientbook-demos --example reconcile_walkthrough
//! ```

use clientbook_core::{DesiredSchema, ForeignKeyAction, TableDef};
use clientbook_sqlite::{Reconciler, introspect, reconcile_schema};
use rusqlite::Connection;

fn main() {
    // === Step 1: A database written by an older release ===
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE Users (id INTEGER PRIMARY KEY, nickname TEXT, name TEXT);
         INSERT INTO Users (id, nickname, name) VALUES (1, 'ana', 'Ana'), (2, 'bo', 'Bo');",
    )
    .unwrap();

    let schema = DesiredSchema::new()
        .with_table(
            TableDef::new("Users")
                .column("id", "INTEGER PRIMARY KEY")
                .column("name", "TEXT")
                .column("email", "TEXT")
                .build(),
        )
        .with_table(
            TableDef::new("Orders")
                .column("id", "INTEGER PRIMARY KEY")
                .column("userId", "INTEGER")
                .column("total", "REAL")
                .foreign_key("userId", "Users", "id", ForeignKeyAction::Cascade)
                .build(),
        );

    // === Step 2: Plan without writing ===
    println!("=== Plan ===");
    for table in Reconciler::new(&schema).plan(&conn).unwrap() {
        println!("  {}: {}", table.table, table.plan);
    }

    // === Step 3: Reconcile ===
    println!("\n=== Reconcile ===");
    let report = reconcile_schema(&mut conn, &schema).unwrap();
    for table in report.tables() {
        println!("  {}: {}", table.table, table.outcome);
    }
    println!("\nReport as JSON:");
    println!("{}", serde_json::to_string_pretty(&report).unwrap());

    // === Step 4: Inspect the result ===
    println!("\n=== Users after reconciliation ===");
    for column in introspect::table_columns(&conn, "Users").unwrap() {
        println!("  {} {}", column.name, column.declared_type);
    }
    let mut stmt = conn
        .prepare("SELECT id, name, email FROM Users ORDER BY id")
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })
        .unwrap();
    for row in rows {
        let (id, name, email) = row.unwrap();
        println!("  {id}: {name} <{}>", email.as_deref().unwrap_or("no email"));
    }
    drop(stmt);

    // === Step 5: Second pass is a no-op ===
    let again = reconcile_schema(&mut conn, &schema).unwrap();
    println!("\nSecond pass changed nothing: {}", again.is_noop());
    println!(
        "Foreign keys enforced: {}",
        introspect::foreign_keys_enabled(&conn).unwrap()
    );
}
