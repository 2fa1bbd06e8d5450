//! Record types stored in the client registry.
//!
//! Text columns may hold `NULL` in rows carried over by a rebuild; those read
//! back as empty strings, and numeric columns as zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub internal_id: i64,
    pub cpf: String,
    pub id_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub cep: String,
    /// Address as stored, normally `street, number, neighborhood, city`.
    pub address: String,
}

impl User {
    /// Splits the stored address into its parts, if it has the usual shape.
    pub fn address_parts(&self) -> Option<Address> {
        Address::parse(&self.address)
    }
}

/// Fields for a new [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub cpf: String,
    pub id_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub cep: String,
    pub address: String,
}

/// Editable fields of an existing [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub id_name: String,
    pub contact_name: String,
    /// A blank email is stored as an empty string.
    pub email: String,
    pub phone: String,
}

/// A postal address split into its four parts.
///
/// # Examples
///
/// ```
/// use clientbook_sqlite::Address;
///
/// let address = Address::parse("Rua A, 12, Centro, Recife").unwrap();
/// assert_eq!(address.number, "12");
/// assert_eq!(address.to_string(), "Rua A, 12, Centro, Recife");
///
/// assert!(Address::parse("Rua A, 12").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
}

impl Address {
    /// Parses `street, number, neighborhood, city`.
    ///
    /// Returns `None` unless there are exactly four comma-separated parts.
    /// Each part is trimmed.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [street, number, neighborhood, city] => Some(Self {
                street: street.to_string(),
                number: number.to_string(),
                neighborhood: neighborhood.to_string(),
                city: city.to_string(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.street, self.number, self.neighborhood, self.city
        )
    }
}

/// A line item to add to a purchase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPurchaseItem {
    pub purchase_id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
    pub discount: String,
}

/// One row of a user's purchase history: a purchase joined with one of its
/// items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseHistoryEntry {
    pub purchase_id: i64,
    pub date: String,
    pub total_price: f64,
    pub item_name: String,
    pub quantity: i64,
    pub price: f64,
    pub discount: String,
}

/// A machine registered for service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub internal_id: i64,
    /// Serial number printed on the machine.
    pub machine_id: String,
    pub machine_model: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_phone2: String,
}

/// Fields for a new [`Machine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMachine {
    pub machine_id: String,
    pub machine_model: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_phone2: String,
}

/// Editable fields of an existing [`Machine`]. The serial number is fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineUpdate {
    pub machine_model: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_phone2: String,
}

/// A service record for a machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub repair_id: i64,
    /// `internalId` of the machine.
    pub machine_id: i64,
    pub description: String,
    pub price: f64,
    pub date: String,
    pub service_order: String,
    pub done: bool,
}

/// Fields for a new [`Repair`]. New repairs start not done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRepair {
    pub machine_id: i64,
    pub description: String,
    pub price: f64,
    pub date: String,
    pub service_order: String,
}

/// Editable fields of an existing [`Repair`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairUpdate {
    pub description: String,
    pub service_order: String,
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_trims_parts() {
        let address = Address::parse("  Rua das Flores ,10,  Boa Vista, Recife ").unwrap();
        assert_eq!(
            address,
            Address {
                street: "Rua das Flores".to_string(),
                number: "10".to_string(),
                neighborhood: "Boa Vista".to_string(),
                city: "Recife".to_string(),
            }
        );
    }

    #[test]
    fn test_address_parse_requires_four_parts() {
        assert!(Address::parse("").is_none());
        assert!(Address::parse("a, b, c").is_none());
        assert!(Address::parse("a, b, c, d, e").is_none());
    }

    #[test]
    fn test_user_address_parts() {
        let user = User {
            address: "Av. Norte, 5, Centro, Olinda".to_string(),
            ..User::default()
        };
        assert_eq!(user.address_parts().unwrap().city, "Olinda");
    }
}
