//! Client registry workflow.
//!
//! Reconciles the registry catalog into a temporary database, then records a
//! customer, a purchase and a machine repair through [`ClientStore`].
//!
//! # Usage
//!
//! ```bash
//! cargo run -p clientbook-demos --example client_registry
//! ```

use clientbook_sqlite::{
    ClientStore, NewMachine, NewPurchaseItem, NewRepair, NewUser, client_catalog,
    reconcile_schema,
};
use rusqlite::Connection;

fn main() {
    let path = std::env::temp_dir().join(format!("clientbook_demo_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    // === Step 1: Reconcile the registry schema ===
    let mut conn = Connection::open(&path).unwrap();
    let report = reconcile_schema(&mut conn, &client_catalog()).unwrap();
    println!("Created {} table(s) in {}", report.created(), path.display());

    let store = ClientStore::new(&conn).unwrap();

    // === Step 2: Customers ===
    let user_id = store
        .insert_user(&NewUser {
            id_name: "ACME Ltda".into(),
            contact_name: "Maria Silva".into(),
            phone: "81 5555-0101".into(),
            address: "Rua das Flores, 12, Boa Vista, Recife".into(),
            ..Default::default()
        })
        .unwrap();
    let user = store.get_user(user_id).unwrap().unwrap();
    println!("\nUser {}: {}", user.internal_id, user.id_name);
    if let Some(address) = user.address_parts() {
        println!("  lives in {}", address.city);
    }

    // === Step 3: A purchase with two items ===
    let purchase_id = store.insert_purchase(user_id, "2024-05-01").unwrap();
    for (name, quantity, price) in [("Chain", 1, 35.0), ("Oil", 2, 12.5)] {
        store
            .insert_purchase_item(&NewPurchaseItem {
                purchase_id,
                item_name: name.into(),
                quantity,
                price,
                discount: String::new(),
            })
            .unwrap();
    }
    let total = store.update_total_price(purchase_id).unwrap();
    println!("\nPurchase {purchase_id} total: {total:.2}");
    for entry in store.purchase_history(user_id).unwrap() {
        println!("  {} x {} at {:.2}", entry.quantity, entry.item_name, entry.price);
    }

    // === Step 4: A machine and its repair ===
    let machine_id = store
        .insert_machine(&NewMachine {
            machine_id: "SN-0042".into(),
            machine_model: "Chainsaw 250".into(),
            owner_name: user.contact_name.clone(),
            ..Default::default()
        })
        .unwrap();
    store
        .insert_repair(&NewRepair {
            machine_id,
            description: "Replace chain".into(),
            price: 35.0,
            date: "2024-05-02".into(),
            service_order: "OS-17".into(),
        })
        .unwrap();
    for repair in store.repairs_for_machine(machine_id).unwrap() {
        println!(
            "\nRepair {} on {}: {} ({})",
            repair.repair_id,
            repair.date,
            repair.description,
            if repair.done { "done" } else { "open" }
        );
    }

    // === Cleanup ===
    drop(store);
    drop(conn);
    std::fs::remove_file(&path).unwrap();
    println!("\nCleaned up {}", path.display());
}
