use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const RESERVATION_TTL_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    /// `None` means the product is not inventory-tracked and never sells out.
    pub inventory: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSnapshot {
    pub id: Option<Uuid>,
    pub name: String,
    pub price: Option<BigDecimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub meal: MealSnapshot,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Value>,
}

impl CartLine {
    pub fn line_total(&self) -> BigDecimal {
        match &self.meal.price {
            Some(price) => price.clone() * BigDecimal::from(self.quantity),
            None => BigDecimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub subtotal: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            subtotal: BigDecimal::zero(),
            updated_at: now,
        }
    }

    pub fn recompute_subtotal(&mut self) {
        self.subtotal = self
            .items
            .iter()
            .map(CartLine::line_total)
            .fold(BigDecimal::zero(), |acc, line_total| acc + line_total);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub user_id: Uuid,
    pub items: Vec<ReservationItem>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn for_cart(user_id: Uuid, items: Vec<ReservationItem>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items,
            expires_at: now + Duration::minutes(RESERVATION_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    OutOfStock,
    QtyReduced,
    UnresolvedItemSkipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartWarning {
    pub code: WarningCode,
    pub product_id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_qty: Option<i32>,
}

impl CartWarning {
    pub fn out_of_stock(product_id: Uuid, name: String) -> Self {
        Self {
            code: WarningCode::OutOfStock,
            product_id: Some(product_id),
            name,
            new_qty: None,
        }
    }

    pub fn qty_reduced(product_id: Uuid, name: String, new_qty: i32) -> Self {
        Self {
            code: WarningCode::QtyReduced,
            product_id: Some(product_id),
            name,
            new_qty: Some(new_qty),
        }
    }

    pub fn unresolved(name: String) -> Self {
        Self {
            code: WarningCode::UnresolvedItemSkipped,
            product_id: None,
            name,
            new_qty: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cod" => Some(PaymentMethod::Cod),
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            _ => None,
        }
    }

    /// Cash on delivery needs no separate payment confirmation step.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::Cod => OrderStatus::Confirmed,
            PaymentMethod::Card | PaymentMethod::Upi => OrderStatus::PendingPayment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Confirmed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_payment" => Some(OrderStatus::PendingPayment),
            "confirmed" => Some(OrderStatus::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<BigDecimal>,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
    pub delivery_address: Value,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
