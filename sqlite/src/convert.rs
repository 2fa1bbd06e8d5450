//! Row mapping between the registry tables and the record types in
//! [`models`](crate::models).
//!
//! Column lists live here next to the mappers that read them, so a `SELECT`
//! and its mapper cannot disagree on column positions.

use rusqlite::Row;

use crate::models::{Machine, PurchaseHistoryEntry, Repair, User};

pub(crate) const USER_COLUMNS: &str =
    "internalId, cpf, idName, contactName, email, phone, cep, address";

pub(crate) const MACHINE_COLUMNS: &str =
    "internalId, machineId, machineModel, ownerName, ownerPhone, ownerPhone2";

pub(crate) const REPAIR_COLUMNS: &str =
    "repairId, machineId, description, price, date, serviceOrder, done";

pub(crate) const HISTORY_COLUMNS: &str =
    "P.purchaseId, P.date, P.total_price, I.itemName, I.quantity, I.price, I.discount";

/// Reads a nullable text column, mapping `NULL` to an empty string.
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn real(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or_default())
}

fn integer(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or_default())
}

/// Maps a row selected with [`USER_COLUMNS`].
pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        internal_id: row.get(0)?,
        cpf: text(row, 1)?,
        id_name: text(row, 2)?,
        contact_name: text(row, 3)?,
        email: text(row, 4)?,
        phone: text(row, 5)?,
        cep: text(row, 6)?,
        address: text(row, 7)?,
    })
}

/// Maps a row selected with [`MACHINE_COLUMNS`].
pub(crate) fn machine_from_row(row: &Row<'_>) -> rusqlite::Result<Machine> {
    Ok(Machine {
        internal_id: row.get(0)?,
        machine_id: text(row, 1)?,
        machine_model: text(row, 2)?,
        owner_name: text(row, 3)?,
        owner_phone: text(row, 4)?,
        owner_phone2: text(row, 5)?,
    })
}

/// Maps a row selected with [`REPAIR_COLUMNS`].
pub(crate) fn repair_from_row(row: &Row<'_>) -> rusqlite::Result<Repair> {
    Ok(Repair {
        repair_id: row.get(0)?,
        machine_id: integer(row, 1)?,
        description: text(row, 2)?,
        price: real(row, 3)?,
        date: text(row, 4)?,
        service_order: text(row, 5)?,
        done: integer(row, 6)? != 0,
    })
}

/// Maps a row selected with [`HISTORY_COLUMNS`].
pub(crate) fn history_from_row(row: &Row<'_>) -> rusqlite::Result<PurchaseHistoryEntry> {
    Ok(PurchaseHistoryEntry {
        purchase_id: row.get(0)?,
        date: text(row, 1)?,
        total_price: real(row, 2)?,
        item_name: text(row, 3)?,
        quantity: integer(row, 4)?,
        price: real(row, 5)?,
        discount: text(row, 6)?,
    })
}
