use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kohi_common::Vnd;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        Meal        ----------------------------------------------------------
/// A meal from the catalog subsystem. The order engine only ever reads meals: the price is captured onto the order
/// line item at creation time, and the display metadata is resolved when order details are returned.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Vnd,
    pub is_available: bool,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order is newly created and no staff member has started preparing it.
    Pending,
    /// A staff member is preparing the order.
    InProgress,
    /// The order has been handed to the customer.
    Completed,
    /// The order has been cancelled by staff.
    Cancelled,
}

impl OrderStatusType {
    /// The legal forward transitions for the staff-driven part of the order lifecycle. Same-state and backward
    /// changes are rejected, and the two terminal states cannot be left.
    pub fn can_transition_to(self, new_status: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, new_status),
            (Pending, InProgress) | (Pending, Cancelled) | (InProgress, Completed) | (InProgress, Cancelled)
        )
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::InProgress => write!(f, "InProgress"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// No valid gateway callback has been processed for the order yet.
    Unpaid,
    /// The gateway reported a successful payment. Terminal.
    Paid,
    /// The gateway reported a failed payment. Terminal.
    Failed,
}

impl PaymentStatusType {
    /// `Paid` and `Failed` are terminal: callback reprocessing must leave them untouched.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatusType::Paid | PaymentStatusType::Failed)
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Unpaid => write!(f, "Unpaid"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" => Ok(Self::Unpaid),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------        Order       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    /// The staff member responsible for the order. Unset until claimed; set exactly once.
    pub staff_id: Option<i64>,
    /// The signed gateway redirect URL issued for this order.
    pub payment_url: Option<String>,
}

impl Order {
    pub fn is_claimed(&self) -> bool {
        self.staff_id.is_some()
    }
}

//--------------------------------------      OrderItem     ----------------------------------------------------------
/// One meal-and-quantity record attached to an order. The price is the unit price frozen at order time and must
/// never be re-read from the catalog, since catalog prices may change.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub meal_id: i64,
    pub quantity: i64,
    pub price: Vnd,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> Vnd {
        self.price * self.quantity
    }
}

//--------------------------------------    NewOrderItem    ----------------------------------------------------------
/// A line item that has not been persisted yet. Ids and timestamps are assigned by the database on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub meal_id: i64,
    pub quantity: i64,
    pub price: Vnd,
}

impl NewOrderItem {
    pub fn new(meal_id: i64, quantity: i64, price: Vnd) -> Self {
        Self { meal_id, quantity, price }
    }

    pub fn line_total(&self) -> Vnd {
        self.price * self.quantity
    }
}
