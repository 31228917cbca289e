use chrono::{DateTime, Utc};
use kohi_common::Vnd;
use serde::{Deserialize, Serialize};

use crate::db_types::{Meal, Order, OrderItem, OrderStatusType, PaymentStatusType};

//--------------------------------------      Pagination     ---------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset-based pagination. Pages are 1-based; a page past the last one yields an empty result, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

//--------------------------------------   OrderItemDetail   ---------------------------------------------------------
/// A line item enriched with the display metadata of its meal. The price and quantity come from the immutable line
/// item; name, description and image are resolved from the catalog at display time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDetail {
    pub id: i64,
    pub meal_id: i64,
    pub quantity: i64,
    pub price: Vnd,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

impl OrderItemDetail {
    pub fn from_parts(item: &OrderItem, meal: &Meal) -> Self {
        Self {
            id: item.id,
            meal_id: item.meal_id,
            quantity: item.quantity,
            price: item.price,
            name: meal.name.clone(),
            description: meal.description.clone(),
            image_url: meal.image_url.clone(),
        }
    }
}

//--------------------------------------     OrderDetail     ---------------------------------------------------------
/// The full customer/staff-facing view of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub staff_id: Option<i64>,
    pub payment_url: Option<String>,
    pub total: Vnd,
    pub items: Vec<OrderItemDetail>,
}

impl OrderDetail {
    pub fn from_parts(order: Order, items: Vec<OrderItemDetail>) -> Self {
        let total = items.iter().map(|i| i.price * i.quantity).sum();
        Self {
            id: order.id,
            created_at: order.created_at,
            updated_at: order.updated_at,
            order_status: order.order_status,
            payment_status: order.payment_status,
            staff_id: order.staff_id,
            payment_url: order.payment_url,
            total,
            items,
        }
    }
}

//--------------------------------------      OrderPage      ---------------------------------------------------------
/// One page of the order listing. Echoes the page and size the listing was built from so clients can drive the
/// next request without keeping their own cursor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub page: i64,
    pub size: i64,
    pub orders: Vec<OrderDetail>,
}

//--------------------------------------  PaymentReturnResult ---------------------------------------------------------
/// The outcome of a verified gateway return callback. `new_settlement` is false when the callback was a replay of
/// one that had already been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReturnResult {
    pub order_id: i64,
    pub payment_status: PaymentStatusType,
    pub message: String,
    pub bank_code: Option<String>,
    pub amount: Option<Vnd>,
    pub new_settlement: bool,
}
