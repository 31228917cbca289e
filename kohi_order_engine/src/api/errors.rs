use thiserror::Error;

use crate::{db_types::OrderStatusType, traits::OrderDatabaseError, vnpay::VnPayError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("None of the requested meals are available, so the order would be empty.")]
    EmptyOrder,
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} has already been claimed by another staff member")]
    AlreadyClaimed(i64),
    #[error("Order status may not change from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("The payment for order {0} is no longer pending")]
    PaymentNotPending(i64),
    #[error("The payment callback signature is invalid")]
    InvalidSignature,
    #[error("The payment callback is malformed. {0}")]
    MalformedCallback(String),
    #[error("Invalid payment gateway configuration. {0}")]
    ConfigurationError(String),
    #[error("Backend storage error: {0}")]
    DatabaseError(String),
}

impl From<OrderDatabaseError> for OrderFlowError {
    fn from(e: OrderDatabaseError) -> Self {
        match e {
            OrderDatabaseError::EmptyOrder => OrderFlowError::EmptyOrder,
            OrderDatabaseError::DatabaseError(e) => OrderFlowError::DatabaseError(e),
        }
    }
}

impl From<VnPayError> for OrderFlowError {
    fn from(e: VnPayError) -> Self {
        match e {
            VnPayError::InvalidSignature => OrderFlowError::InvalidSignature,
            VnPayError::MalformedCallback(m) => OrderFlowError::MalformedCallback(m),
            VnPayError::ConfigurationError(m) => OrderFlowError::ConfigurationError(m),
        }
    }
}
