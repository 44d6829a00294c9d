use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use shared::{Cart, CartLine, Order, OrderLine, OrderStatus, PaymentMethod, Product, Reservation, ReservationItem};

use super::StoreError;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = super::schema::products)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub inventory: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: row.price,
            inventory: row.inventory,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = super::schema::products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub inventory: Option<i32>,
}

impl From<&Product> for NewProductRow {
    fn from(product: &Product) -> Self {
        NewProductRow {
            id: product.id,
            name: product.name.clone(),
            price: product.price.clone(),
            inventory: product.inventory,
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = super::schema::carts)]
pub struct CartRow {
    pub user_id: Uuid,
    pub items: serde_json::Value,
    pub subtotal: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

impl CartRow {
    pub fn from_domain(cart: &Cart) -> Result<Self, StoreError> {
        Ok(CartRow {
            user_id: cart.user_id,
            items: serde_json::to_value(&cart.items)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            subtotal: cart.subtotal.clone(),
            updated_at: cart.updated_at,
        })
    }
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let items: Vec<CartLine> = serde_json::from_value(row.items)
            .map_err(|e| StoreError::Corrupt(format!("cart items for {}: {}", row.user_id, e)))?;
        Ok(Cart {
            user_id: row.user_id,
            items,
            subtotal: row.subtotal,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = super::schema::reservations)]
pub struct ReservationRow {
    pub user_id: Uuid,
    pub items: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

impl ReservationRow {
    pub fn from_domain(reservation: &Reservation) -> Result<Self, StoreError> {
        Ok(ReservationRow {
            user_id: reservation.user_id,
            items: serde_json::to_value(&reservation.items)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            expires_at: reservation.expires_at,
        })
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let items: Vec<ReservationItem> = serde_json::from_value(row.items).map_err(|e| {
            StoreError::Corrupt(format!("reservation items for {}: {}", row.user_id, e))
        })?;
        Ok(Reservation {
            user_id: row.user_id,
            items,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Insertable, Identifiable)]
#[diesel(table_name = super::schema::orders)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: serde_json::Value,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub delivery_address: serde_json::Value,
    pub payment_method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn from_domain(order: &Order) -> Result<Self, StoreError> {
        Ok(OrderRow {
            id: order.id,
            user_id: order.user_id,
            items: serde_json::to_value(&order.items)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            subtotal: order.subtotal.clone(),
            tax: order.tax.clone(),
            delivery_fee: order.delivery_fee.clone(),
            total: order.total.clone(),
            delivery_address: order.delivery_address.clone(),
            payment_method: order.payment_method.as_str().to_string(),
            status: order.status.as_str().to_string(),
            created_at: order.created_at,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<OrderLine> = serde_json::from_value(row.items)
            .map_err(|e| StoreError::Corrupt(format!("order items for {}: {}", row.id, e)))?;
        let payment_method = PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown payment method {}", row.payment_method))
        })?;
        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order status {}", row.status)))?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items,
            subtotal: row.subtotal,
            tax: row.tax,
            delivery_fee: row.delivery_fee,
            total: row.total,
            delivery_address: row.delivery_address,
            payment_method,
            status,
            created_at: row.created_at,
        })
    }
}
