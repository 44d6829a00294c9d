use bigdecimal::BigDecimal;
use tracing::info;
use uuid::Uuid;

use shared::Product;

use crate::store::{Store, StoreError};

const DEMO_MENU: &[(&str, &str, Option<i32>)] = &[
    ("Grilled Chicken Power Bowl", "12.99", Some(25)),
    ("Vegan Buddha Bowl", "11.49", Some(30)),
    ("Paneer Tikka Wrap", "9.99", Some(40)),
    ("Masala Dosa Combo", "10.49", Some(20)),
    ("Butter Chicken with Naan", "13.99", Some(35)),
    ("Rice & Beans", "8.49", Some(50)),
    ("Cold Brew Coffee", "4.99", None),
];

/// Seeds the demo menu, skipping names that already exist so restarts do
/// not duplicate products. Returns how many were inserted.
pub async fn seed_demo_catalog(store: &dyn Store) -> Result<usize, StoreError> {
    let existing = store.list_products().await?;
    let mut inserted = 0;

    for (name, price, inventory) in DEMO_MENU {
        if existing
            .iter()
            .any(|product| product.name.eq_ignore_ascii_case(name))
        {
            continue;
        }
        let price: BigDecimal = price
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("demo price for {}: {}", name, e)))?;
        let product = Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            inventory: *inventory,
        };
        store.insert_product(&product).await?;
        info!("Seeded demo product '{}'", name);
        inserted += 1;
    }

    Ok(inserted)
}
