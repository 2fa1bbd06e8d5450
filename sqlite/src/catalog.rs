//! The client registry's table catalog.
//!
//! Tables are listed parents first so creation never references a table that
//! does not exist yet:
//!
//! - `Users`: customers
//! - `Purchases`: one purchase per user visit, `Users` child
//! - `PurchasesItems`: line items, `Purchases` child
//! - `Machines`: customer machines registered for service
//! - `Repairs`: service records, `Machines` child
//!
//! Every child foreign key uses `ON DELETE CASCADE`, so removing a user or a
//! machine removes its history with it.

use clientbook_core::{DesiredSchema, ForeignKeyAction, TableDef};

pub const USERS: &str = "Users";
pub const PURCHASES: &str = "Purchases";
pub const PURCHASE_ITEMS: &str = "PurchasesItems";
pub const MACHINES: &str = "Machines";
pub const REPAIRS: &str = "Repairs";

/// Builds the catalog the application reconciles at startup.
pub fn client_catalog() -> DesiredSchema {
    DesiredSchema::new()
        .with_table(
            TableDef::new(USERS)
                .column("internalId", "INTEGER PRIMARY KEY AUTOINCREMENT")
                .column("phone", "TEXT")
                .column("cpf", "TEXT")
                .column("idName", "TEXT")
                .column("contactName", "TEXT")
                .column("email", "TEXT")
                .column("cep", "TEXT")
                .column("address", "TEXT")
                .build(),
        )
        .with_table(
            TableDef::new(PURCHASES)
                .column("purchaseId", "INTEGER PRIMARY KEY AUTOINCREMENT")
                .column("userId", "INTEGER")
                .column("date", "TEXT")
                .column("total_price", "REAL DEFAULT 0")
                .foreign_key("userId", USERS, "internalId", ForeignKeyAction::Cascade)
                .build(),
        )
        .with_table(
            TableDef::new(PURCHASE_ITEMS)
                .column("itemId", "INTEGER PRIMARY KEY AUTOINCREMENT")
                .column("purchaseId", "INTEGER")
                .column("itemName", "TEXT")
                .column("quantity", "INTEGER")
                .column("price", "REAL")
                .column("discount", "TEXT")
                .foreign_key("purchaseId", PURCHASES, "purchaseId", ForeignKeyAction::Cascade)
                .build(),
        )
        .with_table(
            TableDef::new(MACHINES)
                .column("internalId", "INTEGER PRIMARY KEY AUTOINCREMENT")
                .column("machineId", "TEXT")
                .column("machineModel", "TEXT")
                .column("ownerName", "TEXT")
                .column("ownerPhone", "TEXT")
                .column("ownerPhone2", "TEXT")
                .build(),
        )
        .with_table(
            TableDef::new(REPAIRS)
                .column("repairId", "INTEGER PRIMARY KEY AUTOINCREMENT")
                .column("description", "TEXT")
                .column("machineId", "INTEGER")
                .column("price", "REAL")
                .column("date", "TEXT")
                .column("serviceOrder", "TEXT")
                .column("done", "BOOLEAN")
                .foreign_key("machineId", MACHINES, "internalId", ForeignKeyAction::Cascade)
                .build(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clientbook_core::validate_catalog;

    #[test]
    fn test_catalog_is_valid() {
        assert!(validate_catalog(&client_catalog()).is_empty());
    }

    #[test]
    fn test_catalog_order_puts_parents_first() {
        let catalog = client_catalog();
        let names: Vec<&str> = catalog.table_names().collect();
        assert_eq!(names, vec![USERS, PURCHASES, PURCHASE_ITEMS, MACHINES, REPAIRS]);
    }

    #[test]
    fn test_users_columns() {
        let catalog = client_catalog();
        assert_eq!(
            catalog.get(USERS).unwrap().expected_columns,
            vec![
                "internalId",
                "phone",
                "cpf",
                "idName",
                "contactName",
                "email",
                "cep",
                "address"
            ]
        );
    }

    #[test]
    fn test_catalog_creates_cleanly() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for table in &client_catalog() {
            conn.execute_batch(&table.create_sql()).unwrap();
        }
        // Templates use IF NOT EXISTS, so a second run is harmless.
        for table in &client_catalog() {
            conn.execute_batch(&table.create_sql()).unwrap();
        }
    }

    #[test]
    fn test_repairs_cascade_on_machine_delete() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        for table in &client_catalog() {
            conn.execute_batch(&table.create_sql()).unwrap();
        }
        conn.execute("INSERT INTO Machines (machineId) VALUES ('SN-1')", [])
            .unwrap();
        let machine = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO Repairs (machineId, description, done) VALUES (?1, 'belt', 0)",
            [machine],
        )
        .unwrap();

        conn.execute("DELETE FROM Machines WHERE internalId = ?1", [machine])
            .unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM Repairs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
