//! `SqliteDatabase` is a concrete implementation of the order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use kohi_common::Vnd;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, meals, new_pool, orders};
use crate::{
    api::order_objects::Pagination,
    db_types::{Meal, NewOrderItem, Order, OrderItem, OrderStatusType, PaymentStatusType},
    sqlite::db::create_schema,
    traits::{MealCatalog, OrderDatabaseError, OrderManagementDatabase},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        create_schema(&pool).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, items: Vec<NewOrderItem>) -> Result<Order, OrderDatabaseError> {
        if items.is_empty() {
            return Err(OrderDatabaseError::EmptyOrder);
        }
        let mut tx = self.pool.begin().await?;
        let order_id = orders::insert_order(&mut *tx).await?;
        for item in &items {
            let item_id = orders::insert_order_item(order_id, item, &mut *tx).await?;
            trace!("🗃️ Inserted line item {item_id} (meal {} × {}) for order {order_id}", item.meal_id, item.quantity);
        }
        tx.commit().await?;
        debug!("🗃️ Created order {order_id} with {} line item(s)", items.len());
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| OrderDatabaseError::DatabaseError(format!("Order {order_id} vanished after insert")))?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_order_total(&self, order_id: i64) -> Result<Vnd, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let total = orders::fetch_order_total(order_id, &mut conn).await?;
        Ok(total)
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<bool, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let updated = orders::update_order_status(order_id, from, to, &mut conn).await?;
        Ok(updated)
    }

    async fn claim_order(&self, order_id: i64, staff_id: i64) -> Result<bool, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let claimed = orders::claim_order(order_id, staff_id, &mut conn).await?;
        Ok(claimed)
    }

    async fn settle_payment(&self, order_id: i64, status: PaymentStatusType) -> Result<bool, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let settled = orders::settle_payment(order_id, status, &mut conn).await?;
        Ok(settled)
    }

    async fn update_payment_url(&self, order_id: i64, payment_url: &str) -> Result<(), OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_payment_url(order_id, payment_url, &mut conn).await?;
        Ok(())
    }

    async fn fetch_orders(
        &self,
        pagination: Pagination,
        claimed: Option<bool>,
    ) -> Result<Vec<Order>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders(pagination, claimed, &mut conn).await?;
        Ok(orders)
    }

    async fn close(&mut self) -> Result<(), OrderDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl MealCatalog for SqliteDatabase {
    async fn fetch_meal_by_id(&self, meal_id: i64) -> Result<Option<Meal>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let meal = meals::fetch_meal_by_id(meal_id, &mut conn).await?;
        Ok(meal)
    }
}
