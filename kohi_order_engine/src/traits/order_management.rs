use kohi_common::Vnd;
use thiserror::Error;

use crate::{
    api::order_objects::Pagination,
    db_types::{NewOrderItem, Order, OrderItem, OrderStatusType, PaymentStatusType},
};

/// The persistence contract for the order aggregate.
///
/// Operations that touch shared mutable order state (claim, payment settlement) are specified as **atomic
/// conditional updates**: the predicate is evaluated inside the storage engine, never as a read-then-write in the
/// caller. This is what upholds the single-claim and terminal-payment-status invariants under concurrent requests
/// targeting the same order.
#[allow(async_fn_in_trait)]
pub trait OrderManagementDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a new order together with all its line items in a single transaction.
    ///
    /// The order starts out `Pending`/`Unpaid` and unclaimed. Line items are immutable once written; only the
    /// order's status fields and staff assignment may change afterwards.
    async fn create_order(&self, items: Vec<NewOrderItem>) -> Result<Order, OrderDatabaseError>;

    /// Fetches an order by its id, or `None` if no such order exists.
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderDatabaseError>;

    /// Fetches the line items belonging to an order, in insertion order.
    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderDatabaseError>;

    /// The payable total of an order: Σ(unit price × quantity) over its line items. Computed from the frozen
    /// line-item prices, never from the current catalog.
    async fn fetch_order_total(&self, order_id: i64) -> Result<Vnd, OrderDatabaseError>;

    /// Moves the order status from `from` to `to`. Atomic conditional update (`… WHERE order_status = from`):
    /// returns `true` if this call performed the transition, `false` if the order is missing or its status changed
    /// between the caller's read and this write. Transition legality is the workflow's responsibility, not the
    /// store's; the predicate only guards against stale writes.
    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<bool, OrderDatabaseError>;

    /// Claims the order for a staff member. Atomic conditional update (`… WHERE staff_id IS NULL`): returns `true`
    /// if this call performed the claim, `false` if the order was already claimed by the time the update ran.
    async fn claim_order(&self, order_id: i64, staff_id: i64) -> Result<bool, OrderDatabaseError>;

    /// Moves the payment status out of `Unpaid`. Atomic conditional update (`… WHERE payment_status = 'Unpaid'`):
    /// returns `true` if this call settled the payment, `false` if the payment status was already terminal.
    async fn settle_payment(&self, order_id: i64, status: PaymentStatusType) -> Result<bool, OrderDatabaseError>;

    /// Stores the signed gateway redirect URL on the order record.
    async fn update_payment_url(&self, order_id: i64, payment_url: &str) -> Result<(), OrderDatabaseError>;

    /// Offset-paginated listing, ordered by creation time. `claimed` filters on whether a staff member has been
    /// assigned. Pages past the end yield an empty list.
    async fn fetch_orders(
        &self,
        pagination: Pagination,
        claimed: Option<bool>,
    ) -> Result<Vec<Order>, OrderDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderDatabaseError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot create an order without any line items")]
    EmptyOrder,
}

impl From<sqlx::Error> for OrderDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        OrderDatabaseError::DatabaseError(e.to_string())
    }
}
