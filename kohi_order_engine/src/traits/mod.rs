//! Persistence contracts for the order engine.
//!
//! This module defines the interface contracts that storage backends must implement in order to power the order
//! workflow. The workflow core ([`crate::OrderFlowApi`]) depends only on these traits, so backends can be swapped
//! without touching the flow logic.
//!
//! * [`OrderManagementDatabase`] covers the order aggregate: atomic creation of an order with its line items, reads,
//!   and the conditional single-writer updates (claim, payment settlement).
//! * [`MealCatalog`] is the read-only view onto the meal catalog the workflow needs at order-creation and display
//!   time.
mod meal_catalog;
mod order_management;

pub use meal_catalog::MealCatalog;
pub use order_management::{OrderDatabaseError, OrderManagementDatabase};
