use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Zero;
use tracing::debug;
use uuid::Uuid;

use shared::{Cart, CartLine, CartWarning, Product, Reservation, ReservationItem};

use crate::availability::{self, Availability};
use crate::store::{Store, StoreError};

// menu entries that were renamed; keyed by the trimmed, lowercased old name
const PRODUCT_ALIASES: &[(&str, &str)] = &[
    ("chicken power bowl", "Grilled Chicken Power Bowl"),
    ("veg buddha bowl", "Vegan Buddha Bowl"),
    ("paneer wrap", "Paneer Tikka Wrap"),
    ("dosa combo", "Masala Dosa Combo"),
];

/// Lowercases, folds `&` to `and` and strips everything that is not
/// ascii-alphanumeric, so "Rice & Beans!" and "rice and beans" collide.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace('&', "and")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn lookup_by_name<'a>(catalog: &'a [Product], name: &str) -> Option<&'a Product> {
    if let Some(product) = catalog
        .iter()
        .find(|product| product.name.eq_ignore_ascii_case(name))
    {
        return Some(product);
    }

    let lowered = name.trim().to_lowercase();
    if let Some((_, canonical)) = PRODUCT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
    {
        if let Some(product) = catalog
            .iter()
            .find(|product| product.name.eq_ignore_ascii_case(canonical))
        {
            return Some(product);
        }
    }

    // catalog stays small, a linear normalized scan per line is acceptable
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return None;
    }
    catalog
        .iter()
        .find(|product| normalize_name(&product.name) == normalized)
}

/// Lines that already reference a live product pass through with their
/// snapshot intact. Everything else is re-resolved by name and restamped
/// with the canonical id, name and current price. Lines that cannot be
/// resolved survive only if their stored snapshot still has a usable price.
fn resolve_lines(catalog: &[Product], lines: &[CartLine]) -> (Vec<CartLine>, Vec<CartWarning>) {
    let mut resolved = Vec::with_capacity(lines.len());
    let mut warnings = Vec::new();

    for line in lines {
        if let Some(id) = line.meal.id {
            if catalog.iter().any(|product| product.id == id) {
                resolved.push(line.clone());
                continue;
            }
        }

        match lookup_by_name(catalog, &line.meal.name) {
            Some(product) => {
                debug!(
                    "resolved cart line '{}' to product {}",
                    line.meal.name, product.id
                );
                let mut restamped = line.clone();
                restamped.meal.id = Some(product.id);
                restamped.meal.name = product.name.clone();
                restamped.meal.price = Some(product.price.clone());
                resolved.push(restamped);
            }
            None => {
                let usable_price = line
                    .meal
                    .price
                    .as_ref()
                    .map_or(false, |price| *price > BigDecimal::zero());
                if usable_price {
                    resolved.push(line.clone());
                } else {
                    warnings.push(CartWarning::unresolved(line.meal.name.clone()));
                }
            }
        }
    }

    (resolved, warnings)
}

/// Caps lines against a running per-product remainder, in line order, so
/// two lines of the same product cannot jointly exceed what is available.
fn cap_to_availability(
    lines: Vec<CartLine>,
    availability: &HashMap<Uuid, Availability>,
) -> (Vec<CartLine>, Vec<CartWarning>) {
    let mut remaining = availability.clone();
    let mut kept = Vec::with_capacity(lines.len());
    let mut warnings = Vec::new();

    for mut line in lines {
        let Some(product_id) = line.meal.id else {
            kept.push(line);
            continue;
        };
        let Some(availability) = remaining.get_mut(&product_id) else {
            kept.push(line);
            continue;
        };
        match availability {
            Availability::Untracked => kept.push(line),
            Availability::InStock(left) => {
                if *left <= 0 {
                    warnings.push(CartWarning::out_of_stock(product_id, line.meal.name.clone()));
                } else if line.quantity > *left {
                    let new_qty = *left;
                    warnings.push(CartWarning::qty_reduced(
                        product_id,
                        line.meal.name.clone(),
                        new_qty,
                    ));
                    line.quantity = new_qty;
                    *left = 0;
                    kept.push(line);
                } else {
                    *left -= line.quantity;
                    kept.push(line);
                }
            }
        }
    }

    (kept, warnings)
}

/// Per-product totals for the reservation document, in stable order.
pub fn reservation_items(lines: &[CartLine]) -> Vec<ReservationItem> {
    let mut per_product: HashMap<Uuid, i32> = HashMap::new();
    for line in lines {
        if let Some(product_id) = line.meal.id {
            *per_product.entry(product_id).or_insert(0) += line.quantity;
        }
    }
    let mut items: Vec<ReservationItem> = per_product
        .into_iter()
        .map(|(product_id, quantity)| ReservationItem {
            product_id,
            quantity,
        })
        .collect();
    items.sort_by_key(|item| item.product_id);
    items
}

/// Re-holds the cart's quantities for another TTL window, or releases the
/// hold entirely when the cart has no resolvable lines left.
pub async fn refresh_reservation(
    store: &dyn Store,
    cart: &Cart,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let items = reservation_items(&cart.items);
    if items.is_empty() {
        store.delete_reservation(cart.user_id).await
    } else {
        store
            .upsert_reservation(&Reservation::for_cart(cart.user_id, items, now))
            .await
    }
}

pub struct ReconcileOutcome {
    pub cart: Cart,
    pub warnings: Vec<CartWarning>,
}

/// Runs the full reconciliation pass over `incoming` lines: resolve against
/// the catalog, cap to what other users have not already reserved, persist
/// the cart only when its content actually changed, and slide the
/// reservation window. Reads pass the stored lines as `incoming`; writes
/// pass the client payload.
pub async fn reconcile_cart(
    store: &dyn Store,
    user_id: Uuid,
    incoming: Vec<CartLine>,
    stored: Option<Cart>,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, StoreError> {
    let catalog = store.list_products().await?;

    let (resolved, mut warnings) = resolve_lines(&catalog, &incoming);

    let referenced: Vec<Product> = catalog
        .iter()
        .filter(|product| {
            resolved
                .iter()
                .any(|line| line.meal.id == Some(product.id))
        })
        .cloned()
        .collect();
    let availability = availability::for_products(store, &referenced, user_id, now).await?;

    let (final_lines, cap_warnings) = cap_to_availability(resolved, &availability);
    warnings.extend(cap_warnings);

    let baseline: &[CartLine] = stored.as_ref().map(|cart| cart.items.as_slice()).unwrap_or(&[]);
    let changed = baseline != final_lines.as_slice();

    let cart = if changed {
        let mut cart = stored.unwrap_or_else(|| Cart::empty(user_id, now));
        cart.items = final_lines;
        cart.recompute_subtotal();
        cart.updated_at = now;
        store.upsert_cart(&cart).await?;
        cart
    } else {
        stored.unwrap_or_else(|| Cart::empty(user_id, now))
    };

    refresh_reservation(store, &cart, now).await?;

    Ok(ReconcileOutcome { cart, warnings })
}
