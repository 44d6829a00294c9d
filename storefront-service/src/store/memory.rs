use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::{Cart, Order, OrderStatus, Product, Reservation};

use super::{Store, StoreError};

/// Process-local store used when no DATABASE_URL is configured and by the
/// test suite. Every collection sits behind its own lock; the inventory
/// guard holds the products write lock across the check and the decrement,
/// which gives the same atomicity as the conditional UPDATE in Postgres.
#[derive(Clone, Default)]
pub struct MemoryStore {
    products: Arc<RwLock<HashMap<Uuid, Product>>>,
    carts: Arc<RwLock<HashMap<Uuid, Cart>>>,
    reservations: Arc<RwLock<HashMap<Uuid, Reservation>>>,
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn decrement_inventory_guarded(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(product) => match product.inventory {
                None => Ok(true),
                Some(stock) if stock >= quantity => {
                    product.inventory = Some(stock - quantity);
                    Ok(true)
                }
                Some(_) => Ok(false),
            },
            None => Ok(false),
        }
    }

    async fn increment_inventory(&self, id: Uuid, quantity: i32) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(&id) {
            if let Some(stock) = product.inventory {
                product.inventory = Some(stock + quantity);
            }
        }
        Ok(())
    }

    async fn get_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn upsert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        self.carts.write().await.insert(cart.user_id, cart.clone());
        Ok(())
    }

    async fn get_reservation(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError> {
        let reservations = self.reservations.read().await;
        Ok(reservations
            .get(&user_id)
            .filter(|reservation| !reservation.is_expired(now))
            .cloned())
    }

    async fn reservations_for_products(
        &self,
        product_ids: &[Uuid],
        exclude_user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let reservations = self.reservations.read().await;
        Ok(reservations
            .values()
            .filter(|reservation| {
                reservation.user_id != exclude_user
                    && !reservation.is_expired(now)
                    && reservation
                        .items
                        .iter()
                        .any(|item| product_ids.contains(&item.product_id))
            })
            .cloned()
            .collect())
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        self.reservations
            .write()
            .await
            .insert(reservation.user_id, reservation.clone());
        Ok(())
    }

    async fn delete_reservation(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.reservations.write().await.remove(&user_id);
        Ok(())
    }

    async fn delete_expired_reservations(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut reservations = self.reservations.write().await;
        let before = reservations.len();
        reservations.retain(|_, reservation| !reservation.is_expired(now));
        Ok(before - reservations.len())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut mine: Vec<Order> = orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if let Some(order) = orders.get_mut(&id) {
            order.status = status;
        }
        Ok(())
    }
}
