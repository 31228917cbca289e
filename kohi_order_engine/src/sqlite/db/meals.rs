use kohi_common::Vnd;
use sqlx::SqliteConnection;

use crate::db_types::Meal;

const MEAL_COLUMNS: &str = "id, name, description, price, is_available, image_url, created_at, updated_at";

pub async fn fetch_meal_by_id(meal_id: i64, conn: &mut SqliteConnection) -> Result<Option<Meal>, sqlx::Error> {
    let meal = sqlx::query_as::<_, Meal>(&format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1"))
        .bind(meal_id)
        .fetch_optional(conn)
        .await?;
    Ok(meal)
}

/// Inserts a meal into the catalog table and returns its id. Catalog management proper lives in a different
/// subsystem; this exists for seeding and tests.
pub async fn insert_meal(
    name: &str,
    description: &str,
    price: Vnd,
    is_available: bool,
    image_url: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO meals (name, description, price, is_available, image_url) VALUES ($1, $2, $3, $4, $5) RETURNING \
         id",
    )
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(is_available)
    .bind(image_url)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Updates a meal's catalog price. Existing line items are unaffected: they carry the price frozen at order time.
pub async fn update_meal_price(meal_id: i64, price: Vnd, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE meals SET price = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(price)
        .bind(meal_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Toggles a meal's availability flag.
pub async fn update_meal_availability(
    meal_id: i64,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE meals SET is_available = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(is_available)
        .bind(meal_id)
        .execute(conn)
        .await?;
    Ok(())
}
