//! Record access over a reconciled registry database.
//!
//! Provides [`ClientStore`] for CRUD operations on users, purchases,
//! machines and repairs. Every statement is parameterized. Deletes rely on
//! the catalog's cascading foreign keys to remove dependent rows.
//!
//! # Example
//!
//! ```no_run
//! use clientbook_sqlite::{ClientStore, NewUser, client_catalog, reconcile_schema};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("clientsDatabase.db").unwrap();
//! reconcile_schema(&mut conn, &client_catalog()).unwrap();
//!
//! let store = ClientStore::new(&conn).unwrap();
//! let id = store
//!     .insert_user(&NewUser {
//!         id_name: "ACME Ltda".to_string(),
//!         contact_name: "Silva".to_string(),
//!         ..NewUser::default()
//!     })
//!     .unwrap();
//! assert!(store.get_user(id).unwrap().is_some());
//! ```

use rusqlite::{Connection, OptionalExtension, params};

use crate::convert::{
    self, HISTORY_COLUMNS, MACHINE_COLUMNS, REPAIR_COLUMNS, USER_COLUMNS,
};
use crate::error::{Result, SchemaError};
use crate::models::{
    Machine, MachineUpdate, NewMachine, NewPurchaseItem, NewRepair, NewUser, PurchaseHistoryEntry,
    Repair, RepairUpdate, User, UserUpdate,
};

/// CRUD interface for the client registry tables.
///
/// The schema must already be reconciled; [`ClientStore::new`] only turns on
/// foreign-key enforcement for the connection.
pub struct ClientStore<'a> {
    conn: &'a Connection,
}

impl<'a> ClientStore<'a> {
    /// Wraps `conn` and enables `PRAGMA foreign_keys`.
    pub fn new(conn: &'a Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    // ---- users ----

    /// Inserts a user and returns its `internalId`.
    pub fn insert_user(&self, user: &NewUser) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO Users (cpf, idName, contactName, email, phone, cep, address)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.cpf,
                user.id_name,
                user.contact_name,
                user.email,
                user.phone,
                user.cep,
                user.address
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a user by `internalId`.
    pub fn get_user(&self, internal_id: i64) -> Result<Option<User>> {
        self.find_user("internalId", &internal_id)
    }

    /// First user with this CPF.
    pub fn find_user_by_cpf(&self, cpf: &str) -> Result<Option<User>> {
        self.find_user("cpf", &cpf)
    }

    /// First user with this contact name.
    pub fn find_user_by_contact_name(&self, contact_name: &str) -> Result<Option<User>> {
        self.find_user("contactName", &contact_name)
    }

    /// First user with this phone number.
    pub fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        self.find_user("phone", &phone)
    }

    fn find_user(&self, column: &str, value: &dyn rusqlite::ToSql) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM Users WHERE {column} = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, [value], convert::user_from_row)
            .optional()?)
    }

    /// All users, ordered by `idName` then `contactName`.
    pub fn all_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM Users ORDER BY idName, contactName"
        ))?;
        let users = stmt
            .query_map([], convert::user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Updates a user's names, email and phone.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RecordNotFound`] if no user has this id.
    pub fn update_user(&self, internal_id: i64, update: &UserUpdate) -> Result<()> {
        let email = if update.email.trim().is_empty() {
            ""
        } else {
            update.email.as_str()
        };
        let changed = self.conn.execute(
            "UPDATE Users SET idName = ?1, contactName = ?2, email = ?3, phone = ?4
             WHERE internalId = ?5",
            params![update.id_name, update.contact_name, email, update.phone, internal_id],
        )?;
        expect_changed(changed, "user", internal_id)
    }

    /// Deletes a user along with their purchases. Returns `false` if no user
    /// had this id.
    pub fn remove_user(&self, internal_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM Users WHERE internalId = ?1", [internal_id])?;
        Ok(changed > 0)
    }

    // ---- purchases ----

    /// Starts a purchase for a user and returns its `purchaseId`.
    ///
    /// The total starts at zero; see [`update_total_price`](Self::update_total_price).
    pub fn insert_purchase(&self, user_id: i64, date: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO Purchases (userId, date) VALUES (?1, ?2)",
            params![user_id, date],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Adds a line item to a purchase and returns its `itemId`.
    pub fn insert_purchase_item(&self, item: &NewPurchaseItem) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO PurchasesItems (purchaseId, itemName, quantity, price, discount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.purchase_id,
                item.item_name,
                item.quantity,
                item.price,
                item.discount
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Recomputes a purchase's total as the sum of `quantity * price` over its
    /// items (zero when it has none) and returns the new total.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RecordNotFound`] if no purchase has this id.
    pub fn update_total_price(&self, purchase_id: i64) -> Result<f64> {
        let changed = self.conn.execute(
            "UPDATE Purchases
             SET total_price = (
                 SELECT COALESCE(SUM(quantity * price), 0)
                 FROM PurchasesItems
                 WHERE purchaseId = ?1
             )
             WHERE purchaseId = ?1",
            [purchase_id],
        )?;
        expect_changed(changed, "purchase", purchase_id)?;
        let total: Option<f64> = self.conn.query_row(
            "SELECT total_price FROM Purchases WHERE purchaseId = ?1",
            [purchase_id],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or_default())
    }

    /// A user's purchases joined with their items, newest first.
    ///
    /// Purchases without items do not appear.
    pub fn purchase_history(&self, user_id: i64) -> Result<Vec<PurchaseHistoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS}
             FROM Purchases P
             JOIN PurchasesItems I ON P.purchaseId = I.purchaseId
             WHERE P.userId = ?1
             ORDER BY P.date DESC, P.purchaseId DESC, I.itemId"
        ))?;
        let entries = stmt
            .query_map([user_id], convert::history_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    // ---- machines ----

    /// Registers a machine and returns its `internalId`.
    pub fn insert_machine(&self, machine: &NewMachine) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO Machines (machineId, machineModel, ownerName, ownerPhone, ownerPhone2)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                machine.machine_id,
                machine.machine_model,
                machine.owner_name,
                machine.owner_phone,
                machine.owner_phone2
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a machine by `internalId`.
    pub fn get_machine(&self, internal_id: i64) -> Result<Option<Machine>> {
        let sql = format!("SELECT {MACHINE_COLUMNS} FROM Machines WHERE internalId = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, [internal_id], convert::machine_from_row)
            .optional()?)
    }

    /// First machine with this serial number.
    pub fn find_machine_by_serial(&self, machine_id: &str) -> Result<Option<Machine>> {
        let sql = format!("SELECT {MACHINE_COLUMNS} FROM Machines WHERE machineId = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, [machine_id], convert::machine_from_row)
            .optional()?)
    }

    /// All machines, ordered by model.
    pub fn all_machines(&self) -> Result<Vec<Machine>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MACHINE_COLUMNS} FROM Machines ORDER BY machineModel, internalId"
        ))?;
        let machines = stmt
            .query_map([], convert::machine_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(machines)
    }

    /// Updates a machine's model and owner details.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RecordNotFound`] if no machine has this id.
    pub fn update_machine(&self, internal_id: i64, update: &MachineUpdate) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE Machines
             SET machineModel = ?1, ownerName = ?2, ownerPhone = ?3, ownerPhone2 = ?4
             WHERE internalId = ?5",
            params![
                update.machine_model,
                update.owner_name,
                update.owner_phone,
                update.owner_phone2,
                internal_id
            ],
        )?;
        expect_changed(changed, "machine", internal_id)
    }

    /// Deletes a machine along with its repairs. Returns `false` if no
    /// machine had this id.
    pub fn remove_machine(&self, internal_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM Machines WHERE internalId = ?1", [internal_id])?;
        Ok(changed > 0)
    }

    // ---- repairs ----

    /// Records a repair, not yet done, and returns its `repairId`.
    pub fn insert_repair(&self, repair: &NewRepair) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO Repairs (machineId, description, price, date, serviceOrder, done)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                repair.machine_id,
                repair.description,
                repair.price,
                repair.date,
                repair.service_order
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a repair by `repairId`.
    pub fn get_repair(&self, repair_id: i64) -> Result<Option<Repair>> {
        let sql = format!("SELECT {REPAIR_COLUMNS} FROM Repairs WHERE repairId = ?1 LIMIT 1");
        Ok(self
            .conn
            .query_row(&sql, [repair_id], convert::repair_from_row)
            .optional()?)
    }

    /// Repairs of a machine, newest date first.
    pub fn repairs_for_machine(&self, machine_id: i64) -> Result<Vec<Repair>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPAIR_COLUMNS} FROM Repairs WHERE machineId = ?1
             ORDER BY date DESC, repairId DESC"
        ))?;
        let repairs = stmt
            .query_map([machine_id], convert::repair_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(repairs)
    }

    /// Updates a repair's description, service order and done flag.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RecordNotFound`] if no repair has this id.
    pub fn update_repair(&self, repair_id: i64, update: &RepairUpdate) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE Repairs SET description = ?1, serviceOrder = ?2, done = ?3
             WHERE repairId = ?4",
            params![update.description, update.service_order, update.done, repair_id],
        )?;
        expect_changed(changed, "repair", repair_id)
    }
}

fn expect_changed(changed: usize, entity: &'static str, id: i64) -> Result<()> {
    if changed == 0 {
        Err(SchemaError::RecordNotFound { entity, id })
    } else {
        Ok(())
    }
}
