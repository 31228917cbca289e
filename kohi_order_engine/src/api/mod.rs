//! The order engine public API.
//!
//! [`OrderFlowApi`] provides the order lifecycle and payment-reconciliation workflow. It is generic over the
//! storage backend: anything implementing [`crate::traits::OrderManagementDatabase`] and
//! [`crate::traits::MealCatalog`] can drive it.
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
