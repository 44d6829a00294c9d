use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use shared::{Cart, Order, OrderLine, PaymentMethod};

use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("{0}")]
    Invalid(String),
    #[error("Insufficient stock for {name}")]
    InsufficientStock { name: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct OrderDraft {
    pub items: Vec<OrderLine>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub delivery_address: Value,
    pub payment_method: PaymentMethod,
}

/// Places an order: one guarded decrement per line, in line order. The first
/// line that cannot be satisfied aborts the order and returns the units
/// taken by the lines before it. There is no surrounding transaction, so a
/// crash between the decrements and the compensation can leave stock short.
pub async fn place_order(
    store: &dyn Store,
    user_id: Uuid,
    draft: OrderDraft,
    now: DateTime<Utc>,
) -> Result<Order, PlaceOrderError> {
    let items: Vec<OrderLine> = draft
        .items
        .into_iter()
        .filter(|line| line.quantity > 0)
        .collect();

    let deductions: Vec<(Uuid, i32, String)> = items
        .iter()
        .filter_map(|line| {
            line.product_id
                .map(|product_id| (product_id, line.quantity, line.name.clone()))
        })
        .collect();
    if deductions.is_empty() {
        return Err(PlaceOrderError::Invalid(
            "Order must contain at least one item with a product and a positive quantity"
                .to_string(),
        ));
    }

    let mut decremented: Vec<(Uuid, i32)> = Vec::new();
    for (product_id, quantity, name) in &deductions {
        let taken = store
            .decrement_inventory_guarded(*product_id, *quantity)
            .await?;
        if !taken {
            release_decrements(store, &decremented).await;
            return Err(PlaceOrderError::InsufficientStock { name: name.clone() });
        }
        decremented.push((*product_id, *quantity));
    }

    let order = Order {
        id: Uuid::new_v4(),
        user_id,
        items,
        subtotal: draft.subtotal,
        tax: draft.tax,
        delivery_fee: draft.delivery_fee,
        total: draft.total,
        delivery_address: draft.delivery_address,
        payment_method: draft.payment_method,
        status: draft.payment_method.initial_status(),
        created_at: now,
    };
    store.insert_order(&order).await?;
    store.delete_reservation(user_id).await?;

    // cash orders are final at placement; card and UPI carts survive until
    // the payment is confirmed
    if order.payment_method == PaymentMethod::Cod {
        store.upsert_cart(&Cart::empty(user_id, now)).await?;
    }

    info!("Order {} placed by user {}", order.id, user_id);
    Ok(order)
}

async fn release_decrements(store: &dyn Store, decremented: &[(Uuid, i32)]) {
    for (product_id, quantity) in decremented {
        if let Err(e) = store.increment_inventory(*product_id, *quantity).await {
            error!(
                "Failed to return {} unit(s) of {} after aborted order: {}",
                quantity, product_id, e
            );
        }
    }
}
