use kohi_common::Vnd;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    api::order_objects::Pagination,
    db_types::{NewOrderItem, Order, OrderItem, OrderStatusType, PaymentStatusType},
};

const ORDER_COLUMNS: &str = "id, created_at, updated_at, order_status, payment_status, staff_id, payment_url";

/// Inserts a new order row in its initial state (`Pending`/`Unpaid`, unclaimed) and returns its id. This is not
/// atomic on its own. You can embed this call inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO orders (order_status, payment_status) VALUES ('Pending', 'Unpaid') RETURNING id",
    )
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Inserts one line item for an order. Line items are never updated after this.
pub async fn insert_order_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO order_items (order_id, meal_id, quantity, price) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(order_id)
    .bind(item.meal_id)
    .bind(item.quantity)
    .bind(item.price)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the line items of an order in insertion order.
pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, meal_id, quantity, price, created_at, updated_at FROM order_items WHERE order_id = $1 \
         ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// The frozen payable total of the order: Σ(price × quantity) over its line items.
pub async fn fetch_order_total(order_id: i64, conn: &mut SqliteConnection) -> Result<Vnd, sqlx::Error> {
    let total = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT SUM(price * quantity) FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(Vnd::from(total.unwrap_or_default()))
}

/// Moves the order status forward. Conditional on the status the caller validated against, so a write based on a
/// stale read matches zero rows instead of clobbering a later transition. Returns true iff this call performed the
/// update.
pub async fn update_order_status(
    order_id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE orders SET order_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND order_status = $3",
    )
    .bind(to.to_string())
    .bind(order_id)
    .bind(from.to_string())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// The single-writer claim. The `staff_id IS NULL` predicate is evaluated by the storage engine, so exactly one of
/// any number of concurrent claims can succeed. Returns true iff this call performed the assignment.
pub async fn claim_order(order_id: i64, staff_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE orders SET staff_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND staff_id IS NULL",
    )
    .bind(staff_id)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Moves the payment status out of `Unpaid`. The conditional predicate makes terminal states sticky: once `Paid`
/// or `Failed`, a replayed gateway callback matches zero rows. Returns true iff this call settled the payment.
pub async fn settle_payment(
    order_id: i64,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND payment_status = \
         'Unpaid'",
    )
    .bind(status.to_string())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn update_payment_url(
    order_id: i64,
    payment_url: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_url = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(payment_url)
        .bind(order_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Offset-paginated listing ordered by creation time. `claimed` filters on whether a staff member is assigned.
pub async fn fetch_orders(
    pagination: Pagination,
    claimed: Option<bool>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    match claimed {
        Some(true) => {
            builder.push(" WHERE staff_id IS NOT NULL");
        },
        Some(false) => {
            builder.push(" WHERE staff_id IS NULL");
        },
        None => {},
    }
    builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
    builder.push_bind(pagination.size);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("📇️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📇️ Result of fetch_orders: {} rows", orders.len());
    Ok(orders)
}
