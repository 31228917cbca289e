//! Kohi Order Engine
//!
//! The Kohi order engine contains the core logic of the Anteiku Kohi order-management backend: the order lifecycle,
//! the VNPay payment URL and callback handling, and staff workflow (claiming, status progression). It is
//! HTTP-framework agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly. Instead, use the public API provided by the engine. The exception is the data
//!    types stored in the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The engine public API ([`mod@api`]). This provides the public-facing functionality of the order workflow.
//!    Specific backends need to implement the traits in the [`mod@traits`] module in order to act as a backend for
//!    the Kohi order server.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the order workflow. For example, when an order is paid, an [`events::OrderPaidEvent`] is emitted.
//! A simple actor framework is used so that you can easily hook into these events and perform custom actions.
pub mod api;
pub mod db_types;
pub mod events;
pub mod traits;
pub mod vnpay;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{errors::OrderFlowError, order_flow_api::OrderFlowApi, order_objects};
pub use traits::{MealCatalog, OrderDatabaseError, OrderManagementDatabase};
