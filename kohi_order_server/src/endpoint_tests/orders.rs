use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use kohi_common::{Secret, Vnd};
use kohi_order_engine::{
    db_types::{Meal, Order, OrderItem, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    order_objects::{OrderDetail, OrderPage},
    vnpay::VnPayConfig,
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{get_request, post_request, put_request},
    mocks::MockBackend,
};
use crate::{
    config::ProxyConfig,
    routes::{
        health,
        ClaimOrderRoute,
        CreateOrderRoute,
        OrderByIdRoute,
        OrdersRoute,
        PaymentReturnRoute,
        UpdateStatusRoute,
    },
};

fn test_vnpay_config() -> VnPayConfig {
    VnPayConfig::new(
        "KOHI0001",
        Secret::new("ANTEIKUSECRETKEY".to_string()),
        "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
        "https://kohi.example.com/order/payment-return",
    )
}

fn register_api(cfg: &mut ServiceConfig, backend: MockBackend) {
    let api = OrderFlowApi::new(backend, test_vnpay_config(), EventProducers::default());
    cfg.app_data(web::Data::new(api)).app_data(web::Data::new(ProxyConfig::default()));
}

fn meal(id: i64, price: i64) -> Meal {
    Meal {
        id,
        name: format!("Meal {id}"),
        description: "A test meal".to_string(),
        price: Vnd::from(price),
        is_available: true,
        image_url: String::new(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap(),
    }
}

fn order(id: i64) -> Order {
    Order {
        id,
        created_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap(),
        order_status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Unpaid,
        staff_id: None,
        payment_url: Some("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?vnp_TxnRef=1".to_string()),
    }
}

fn order_item(order_id: i64, meal_id: i64, quantity: i64, price: i64) -> OrderItem {
    OrderItem {
        id: 1,
        order_id,
        meal_id,
        quantity,
        price: Vnd::from(price),
        created_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap(),
    }
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/health", |cfg| {
        cfg.service(health);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_order_returns_detail_with_payment_url() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "meals": [5, 5, 5] });
    let (status, body) = post_request("/order", &body, configure_create).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let detail = serde_json::from_str::<OrderDetail>(&body).expect("Response was not an order detail");
    assert_eq!(detail.id, 1);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 3);
    assert_eq!(detail.total, Vnd::from(3 * 29_000));
    assert!(detail.payment_url.is_some());
}

fn configure_create(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_meal_by_id().returning(|id| Ok(Some(meal(id, 29_000))));
    backend.expect_create_order().returning(|items| {
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        Ok(order(1))
    });
    backend.expect_update_payment_url().returning(|_, _| Ok(()));
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id))));
    backend.expect_fetch_order_items().returning(|id| Ok(vec![order_item(id, 5, 3, 29_000)]));
    register_api(cfg, backend);
    cfg.service(CreateOrderRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn orders_with_no_available_meals_are_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "meals": [99] });
    let err = post_request("/order", &body, configure_create_unknown_meal).await.expect_err("Expected error");
    assert!(err.contains("None of the requested meals are available"));
}

fn configure_create_unknown_meal(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_meal_by_id().returning(|_| Ok(None));
    register_api(cfg, backend);
    cfg.service(CreateOrderRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn missing_orders_yield_not_found() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/order/42", configure_missing_order).await.expect_err("Expected error");
    assert!(err.contains("The requested order 42 does not exist"));
}

fn configure_missing_order(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|_| Ok(None));
    register_api(cfg, backend);
    cfg.service(OrderByIdRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn claiming_a_taken_order_conflicts() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "order_id": 1, "staff_id": 12 });
    let err = put_request("/order/claim", &body, configure_claimed_order).await.expect_err("Expected error");
    assert!(err.contains("already been claimed"));
}

fn configure_claimed_order(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| {
        let mut order = order(id);
        order.staff_id = Some(11);
        Ok(Some(order))
    });
    backend.expect_claim_order().returning(|_, _| Ok(false));
    register_api(cfg, backend);
    cfg.service(ClaimOrderRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn illegal_status_transitions_conflict() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "order_id": 1, "staff_id": 11, "status": "Completed" });
    let err = put_request("/order/status", &body, configure_pending_order).await.expect_err("Expected error");
    assert!(err.contains("may not change from Pending to Completed"));
}

fn configure_pending_order(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id))));
    register_api(cfg, backend);
    cfg.service(UpdateStatusRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn forged_payment_callbacks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/order/payment-return?vnp_TxnRef=1&vnp_ResponseCode=00&vnp_SecureHash=00", configure_bare)
        .await
        .expect_err("Expected error");
    // The message stays generic no matter which verification step failed.
    assert_eq!(err, "The payment notification could not be verified");
}

fn configure_bare(cfg: &mut ServiceConfig) {
    // Signature verification fails before the backend is ever consulted.
    register_api(cfg, MockBackend::new());
    cfg.service(PaymentReturnRoute::<MockBackend>::new());
}

#[actix_web::test]
async fn invalid_pagination_reports_every_problem() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/orders?page=0&size=-5", configure_listing).await.expect_err("Expected error");
    assert!(err.contains("page must be 1 or greater"));
    assert!(err.contains("size must be 1 or greater"));
}

#[actix_web::test]
async fn orders_listing_returns_a_detailed_page() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders?claimed=false&size=5", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let page = serde_json::from_str::<OrderPage>(&body).expect("Response was not an order page");
    assert_eq!(page.page, 1);
    assert_eq!(page.size, 5);
    assert_eq!(page.orders.len(), 2);
    assert!(page.orders.iter().all(|o| o.staff_id.is_none()));
    // Listed orders come with resolved meal metadata and a frozen total.
    assert_eq!(page.orders[0].items[0].name, "Meal 5");
    assert_eq!(page.orders[0].total, Vnd::from(2 * 29_000));
}

fn configure_listing(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_orders().returning(|pagination, claimed| {
        assert_eq!(pagination.size, 5);
        assert_eq!(claimed, Some(false));
        Ok(vec![order(1), order(2)])
    });
    backend.expect_fetch_order_items().returning(|id| Ok(vec![order_item(id, 5, 2, 29_000)]));
    backend.expect_fetch_meal_by_id().returning(|id| Ok(Some(meal(id, 29_000))));
    register_api(cfg, backend);
    cfg.service(OrdersRoute::<MockBackend>::new());
}
