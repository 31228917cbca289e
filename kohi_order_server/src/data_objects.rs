use kohi_order_engine::{
    db_types::OrderStatusType,
    order_objects::{Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// The requested meal ids. Repeats are allowed and collapse into line-item quantities.
    pub meals: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOrderRequest {
    pub order_id: i64,
    pub staff_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub order_id: i64,
    pub staff_id: i64,
    pub status: OrderStatusType,
}

/// Query parameters for the order listing endpoint. All fields are optional; validation reports every violation in
/// a single message rather than stopping at the first one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub claimed: Option<bool>,
}

impl OrderQueryParams {
    pub fn validate(&self) -> Result<(Pagination, Option<bool>), String> {
        let mut problems = Vec::new();
        let page = self.page.unwrap_or(1);
        if page < 1 {
            problems.push(format!("page must be 1 or greater, not {page}"));
        }
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if size < 1 {
            problems.push(format!("size must be 1 or greater, not {size}"));
        }
        if size > MAX_PAGE_SIZE {
            problems.push(format!("size must be at most {MAX_PAGE_SIZE}, not {size}"));
        }
        if problems.is_empty() {
            Ok((Pagination::new(page, size), self.claimed))
        } else {
            Err(problems.join("; "))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_query_params_are_valid() {
        let (pagination, claimed) = OrderQueryParams::default().validate().unwrap();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.size, DEFAULT_PAGE_SIZE);
        assert!(claimed.is_none());
    }

    #[test]
    fn all_pagination_problems_are_reported_at_once() {
        let params = OrderQueryParams { page: Some(0), size: Some(-5), claimed: Some(true) };
        let err = params.validate().unwrap_err();
        assert!(err.contains("page must be 1 or greater"));
        assert!(err.contains("size must be 1 or greater"));
    }

    #[test]
    fn oversized_pages_are_rejected() {
        let params = OrderQueryParams { page: Some(1), size: Some(MAX_PAGE_SIZE + 1), claimed: None };
        let err = params.validate().unwrap_err();
        assert!(err.contains("size must be at most"));
    }
}
