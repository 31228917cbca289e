use kohi_common::Vnd;
use kohi_order_engine::{
    db_types::{Meal, NewOrderItem, Order, OrderItem, OrderStatusType, PaymentStatusType},
    order_objects::Pagination,
    traits::{MealCatalog, OrderDatabaseError, OrderManagementDatabase},
};
use mockall::mock;

mock! {
    pub Backend {}
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
    impl OrderManagementDatabase for Backend {
        fn url(&self) -> &str;
        async fn create_order(&self, items: Vec<NewOrderItem>) -> Result<Order, OrderDatabaseError>;
        async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderDatabaseError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderDatabaseError>;
        async fn fetch_order_total(&self, order_id: i64) -> Result<Vnd, OrderDatabaseError>;
        async fn update_order_status(&self, order_id: i64, from: OrderStatusType, to: OrderStatusType) -> Result<bool, OrderDatabaseError>;
        async fn claim_order(&self, order_id: i64, staff_id: i64) -> Result<bool, OrderDatabaseError>;
        async fn settle_payment(&self, order_id: i64, status: PaymentStatusType) -> Result<bool, OrderDatabaseError>;
        async fn update_payment_url(&self, order_id: i64, payment_url: &str) -> Result<(), OrderDatabaseError>;
        async fn fetch_orders(&self, pagination: Pagination, claimed: Option<bool>) -> Result<Vec<Order>, OrderDatabaseError>;
        async fn close(&mut self) -> Result<(), OrderDatabaseError>;
    }
    impl MealCatalog for Backend {
        async fn fetch_meal_by_id(&self, meal_id: i64) -> Result<Option<Meal>, OrderDatabaseError>;
    }
}
