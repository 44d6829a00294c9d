use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::{Product, Reservation};

use crate::store::{Store, StoreError};

/// What a single user is allowed to take of a product right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Untracked,
    InStock(i32),
}

impl Availability {
    pub fn is_out_of_stock(&self) -> bool {
        matches!(self, Availability::InStock(units) if *units <= 0)
    }
}

/// Availability is the tracked stock minus every unexpired hold placed by
/// other users, floored at zero. The requesting user's own hold is excluded
/// so that re-reading a cart never competes with itself.
pub fn compute_availability(
    products: &[Product],
    held_by_others: &[Reservation],
) -> HashMap<Uuid, Availability> {
    let mut held: HashMap<Uuid, i32> = HashMap::new();
    for reservation in held_by_others {
        for item in &reservation.items {
            *held.entry(item.product_id).or_insert(0) += item.quantity;
        }
    }

    products
        .iter()
        .map(|product| {
            let availability = match product.inventory {
                None => Availability::Untracked,
                Some(stock) => {
                    let reserved = held.get(&product.id).copied().unwrap_or(0);
                    Availability::InStock((stock - reserved).max(0))
                }
            };
            (product.id, availability)
        })
        .collect()
}

pub async fn for_products(
    store: &dyn Store,
    products: &[Product],
    exclude_user: Uuid,
    now: DateTime<Utc>,
) -> Result<HashMap<Uuid, Availability>, StoreError> {
    if products.is_empty() {
        return Ok(HashMap::new());
    }
    let product_ids: Vec<Uuid> = products.iter().map(|product| product.id).collect();
    let held = store
        .reservations_for_products(&product_ids, exclude_user, now)
        .await?;
    Ok(compute_availability(products, &held))
}
