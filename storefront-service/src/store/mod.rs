use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared::{Cart, Order, OrderStatus, Product, Reservation};

pub mod memory;
mod models;
pub mod postgres;
mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

/// Persistence seam for the storefront. Backed by Postgres in production
/// and by an in-memory map when no database is configured.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Atomically decrements tracked inventory, guarded so the stock level
    /// can never go negative. Returns `false` when the product is missing
    /// or has fewer units left than requested. Untracked products always
    /// succeed and stay untracked.
    async fn decrement_inventory_guarded(&self, id: Uuid, quantity: i32)
        -> Result<bool, StoreError>;

    /// Returns previously decremented units. A no-op for untracked products.
    async fn increment_inventory(&self, id: Uuid, quantity: i32) -> Result<(), StoreError>;

    async fn get_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError>;
    async fn upsert_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    async fn get_reservation(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError>;

    /// All unexpired reservations held by other users that touch any of the
    /// given products. Expired rows are invisible even before the sweeper
    /// removes them.
    async fn reservations_for_products(
        &self,
        product_ids: &[Uuid],
        exclude_user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StoreError>;

    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError>;
    async fn delete_reservation(&self, user_id: Uuid) -> Result<(), StoreError>;
    async fn delete_expired_reservations(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), StoreError>;
}
