use crate::{db_types::Meal, traits::OrderDatabaseError};

/// Read-only access to the meal catalog. The catalog itself is owned by a separate subsystem; the order workflow
/// only needs prices, availability and display metadata.
#[allow(async_fn_in_trait)]
pub trait MealCatalog: Clone {
    /// Fetches a meal by its id, or `None` if the catalog has no such meal.
    async fn fetch_meal_by_id(&self, meal_id: i64) -> Result<Option<Meal>, OrderDatabaseError>;
}
