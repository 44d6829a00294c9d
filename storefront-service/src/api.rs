use std::sync::Arc;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use shared::{
    Cart, CartLine, CartWarning, MealSnapshot, Order, OrderLine, OrderStatus, PaymentMethod,
    Product,
};

use crate::auth::{AuthenticatedUser, JwtKeys};
use crate::error::ApiError;
use crate::orders::{self, OrderDraft};
use crate::reconcile;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtKeys>,
}

/// `axum::Json` with its rejection reshaped into the `400 {message}` body
/// every other error in this API uses.
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartItemPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub product_id: Option<Uuid>,
    pub meal: Option<MealPayload>,
    pub quantity: i32,
    pub customizations: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPayload {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityPayload {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
    #[serde(default)]
    pub subtotal: BigDecimal,
    #[serde(default)]
    pub tax: BigDecimal,
    #[serde(default)]
    pub delivery_fee: BigDecimal,
    #[serde(default)]
    pub total: BigDecimal,
    #[serde(default)]
    pub delivery_address: Value,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemPayload {
    pub product_id: Option<Uuid>,
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub quantity: i32,
    pub customizations: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
    pub warnings: Vec<CartWarning>,
}

#[derive(Debug, Serialize)]
pub struct CartUpdateResponse {
    pub cart: Cart,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/products", get(list_products))
        .route("/api/products/:product_id", get(get_product))
        .route("/api/cart", get(get_cart).post(replace_cart))
        .route("/api/cart/update/:product_id", put(update_quantity))
        .route("/api/cart/remove/:product_id", delete(remove_item))
        .route("/api/cart/clear", delete(clear_cart))
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/:order_id", get(get_order))
        .route("/api/orders/:order_id/payment", post(confirm_payment))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state.store.list_products().await?;
    Ok(Json(ProductsResponse { products }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(ProductResponse { product }))
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartResponse>, ApiError> {
    let now = Utc::now();
    let stored = state.store.get_cart(user.user_id).await?;
    let incoming = stored
        .as_ref()
        .map(|cart| cart.items.clone())
        .unwrap_or_default();
    let outcome =
        reconcile::reconcile_cart(state.store.as_ref(), user.user_id, incoming, stored, now)
            .await?;
    Ok(Json(CartResponse {
        cart: outcome.cart,
        warnings: outcome.warnings,
    }))
}

pub async fn replace_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CartPayload>,
) -> Result<Json<CartResponse>, ApiError> {
    let now = Utc::now();
    let incoming: Vec<CartLine> = payload.items.into_iter().filter_map(to_cart_line).collect();
    let stored = state.store.get_cart(user.user_id).await?;
    let outcome =
        reconcile::reconcile_cart(state.store.as_ref(), user.user_id, incoming, stored, now)
            .await?;
    Ok(Json(CartResponse {
        cart: outcome.cart,
        warnings: outcome.warnings,
    }))
}

// quantity updates deliberately skip the availability pass; the next cart
// read reconciles the new quantity against live stock
pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityPayload>,
) -> Result<Json<CartUpdateResponse>, ApiError> {
    if payload.quantity < 1 {
        return Err(ApiError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let now = Utc::now();
    let mut cart = state
        .store
        .get_cart(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Item not found in cart".to_string()))?;

    // only the first matching line changes; a second line for the same
    // product with different customizations keeps its own quantity
    let line = cart
        .items
        .iter_mut()
        .find(|line| line.meal.id == Some(product_id))
        .ok_or_else(|| ApiError::NotFound("Item not found in cart".to_string()))?;
    line.quantity = payload.quantity;

    cart.recompute_subtotal();
    cart.updated_at = now;
    state.store.upsert_cart(&cart).await?;
    reconcile::refresh_reservation(state.store.as_ref(), &cart, now).await?;

    Ok(Json(CartUpdateResponse { cart }))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartUpdateResponse>, ApiError> {
    let now = Utc::now();
    let mut cart = state
        .store
        .get_cart(user.user_id)
        .await?
        .unwrap_or_else(|| Cart::empty(user.user_id, now));

    cart.items.retain(|line| line.meal.id != Some(product_id));
    cart.recompute_subtotal();
    cart.updated_at = now;
    state.store.upsert_cart(&cart).await?;
    reconcile::refresh_reservation(state.store.as_ref(), &cart, now).await?;

    Ok(Json(CartUpdateResponse { cart }))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartUpdateResponse>, ApiError> {
    let now = Utc::now();
    let cart = Cart::empty(user.user_id, now);
    state.store.upsert_cart(&cart).await?;
    state.store.delete_reservation(user.user_id).await?;
    Ok(Json(CartUpdateResponse { cart }))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let draft = OrderDraft {
        items: payload.items.into_iter().map(to_order_line).collect(),
        subtotal: payload.subtotal,
        tax: payload.tax,
        delivery_fee: payload.delivery_fee,
        total: payload.total,
        delivery_address: payload.delivery_address,
        payment_method: payload.payment_method,
    };
    let order = orders::place_order(state.store.as_ref(), user.user_id, draft, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse { order })))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.store.orders_for_user(user.user_id).await?;
    Ok(Json(OrdersResponse { orders }))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(OrderResponse { order }))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let now = Utc::now();
    let mut order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.status == OrderStatus::PendingPayment {
        state
            .store
            .set_order_status(order.id, OrderStatus::Confirmed)
            .await?;
        state
            .store
            .upsert_cart(&Cart::empty(user.user_id, now))
            .await?;
        state.store.delete_reservation(user.user_id).await?;
        order.status = OrderStatus::Confirmed;
        info!("Payment confirmed for order {}", order.id);
    }

    Ok(Json(OrderResponse { order }))
}

fn to_cart_line(payload: CartItemPayload) -> Option<CartLine> {
    if payload.quantity <= 0 {
        return None;
    }
    let meal = payload.meal.unwrap_or_default();
    let snapshot = MealSnapshot {
        id: payload.product_id.or(meal.id),
        name: meal.name.unwrap_or_default(),
        price: meal.price,
    };
    if snapshot.id.is_none() && snapshot.name.is_empty() {
        return None;
    }
    Some(CartLine {
        meal: snapshot,
        quantity: payload.quantity,
        customizations: payload.customizations,
    })
}

fn to_order_line(payload: OrderItemPayload) -> OrderLine {
    OrderLine {
        product_id: payload.product_id,
        name: payload.name.unwrap_or_default(),
        price: payload.price,
        quantity: payload.quantity,
        customizations: payload.customizations,
    }
}
