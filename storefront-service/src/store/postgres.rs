use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use shared::{Cart, Order, OrderStatus, Product, Reservation};

use super::models::{CartRow, NewProductRow, OrderRow, ProductRow, ReservationRow};
use super::schema::{carts, orders, products, reservations};
use super::{Store, StoreError};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder().build(config).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
        let conn = AsyncPgConnection::establish(database_url).await?;
        let mut conn: AsyncConnectionWrapper<AsyncPgConnection> = conn.into();
        tokio::task::spawn_blocking(move || {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!("Migration error: {}", e))
        })
        .await??;
        Ok(())
    }

    async fn conn(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::insert_into(products::table)
            .values(NewProductRow::from(product))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.conn().await?;
        let rows = products::table
            .order(products::name.asc())
            .load::<ProductRow>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let mut conn = self.conn().await?;
        let row = products::table
            .filter(products::id.eq(id))
            .first::<ProductRow>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(Product::from))
    }

    async fn decrement_inventory_guarded(
        &self,
        id: Uuid,
        quantity: i32,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            products::table.filter(products::id.eq(id)).filter(
                products::inventory
                    .is_null()
                    .or(products::inventory.assume_not_null().ge(quantity)),
            ),
        )
        .set(products::inventory.eq(products::inventory - quantity))
        .execute(&mut conn)
        .await?;
        Ok(updated == 1)
    }

    async fn increment_inventory(&self, id: Uuid, quantity: i32) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::update(products::table.filter(products::id.eq(id)))
            .set(products::inventory.eq(products::inventory + quantity))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        let mut conn = self.conn().await?;
        let row = carts::table
            .filter(carts::user_id.eq(user_id))
            .first::<CartRow>(&mut conn)
            .await
            .optional()?;
        row.map(Cart::try_from).transpose()
    }

    async fn upsert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let row = CartRow::from_domain(cart)?;
        diesel::insert_into(carts::table)
            .values(&row)
            .on_conflict(carts::user_id)
            .do_update()
            .set((
                carts::items.eq(excluded(carts::items)),
                carts::subtotal.eq(excluded(carts::subtotal)),
                carts::updated_at.eq(excluded(carts::updated_at)),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_reservation(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError> {
        let mut conn = self.conn().await?;
        let row = reservations::table
            .filter(reservations::user_id.eq(user_id))
            .filter(reservations::expires_at.gt(now))
            .first::<ReservationRow>(&mut conn)
            .await
            .optional()?;
        row.map(Reservation::try_from).transpose()
    }

    async fn reservations_for_products(
        &self,
        product_ids: &[Uuid],
        exclude_user: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut conn = self.conn().await?;
        // reservation items live in a jsonb document, so filter by product
        // here after narrowing to unexpired rows of other users
        let rows = reservations::table
            .filter(reservations::user_id.ne(exclude_user))
            .filter(reservations::expires_at.gt(now))
            .load::<ReservationRow>(&mut conn)
            .await?;
        let mut held = Vec::new();
        for row in rows {
            let reservation = Reservation::try_from(row)?;
            if reservation
                .items
                .iter()
                .any(|item| product_ids.contains(&item.product_id))
            {
                held.push(reservation);
            }
        }
        Ok(held)
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let row = ReservationRow::from_domain(reservation)?;
        diesel::insert_into(reservations::table)
            .values(&row)
            .on_conflict(reservations::user_id)
            .do_update()
            .set((
                reservations::items.eq(excluded(reservations::items)),
                reservations::expires_at.eq(excluded(reservations::expires_at)),
            ))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_reservation(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::delete(reservations::table.filter(reservations::user_id.eq(user_id)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_expired_reservations(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.conn().await?;
        let removed = diesel::delete(reservations::table.filter(reservations::expires_at.le(now)))
            .execute(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let row = OrderRow::from_domain(order)?;
        diesel::insert_into(orders::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let mut conn = self.conn().await?;
        let row = orders::table
            .filter(orders::id.eq(id))
            .first::<OrderRow>(&mut conn)
            .await
            .optional()?;
        row.map(Order::try_from).transpose()
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.conn().await?;
        let rows = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .load::<OrderRow>(&mut conn)
            .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::update(orders::table.filter(orders::id.eq(id)))
            .set(orders::status.eq(status.as_str()))
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
