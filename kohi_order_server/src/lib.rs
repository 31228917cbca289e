//! # Kohi order server
//! This module hosts the HTTP surface of the Anteiku Kohi order-management backend. It is responsible for:
//! Accepting customer orders and handing out signed VNPay redirect URLs.
//! Receiving and verifying gateway return callbacks.
//! The staff workflow: claiming orders and moving them through the status lifecycle.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/order`: Order creation, payment URL issuance, the gateway return callback, claiming and status updates.
//! * `/orders`: A paginated order listing for the staff dashboard.
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
