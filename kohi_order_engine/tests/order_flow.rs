//! End-to-end tests of the order workflow against a real (in-memory) SQLite backend.
use std::collections::HashMap;

use hmac::{Hmac, Mac};
use kohi_common::{Secret, Vnd};
use kohi_order_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    order_objects::Pagination,
    sqlite::db::meals,
    traits::OrderManagementDatabase,
    vnpay::VnPayConfig,
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use sha2::Sha512;

const HMAC_SECRET: &str = "ANTEIKUSECRETKEY";
const CLIENT_IP: &str = "203.0.113.7";

fn gateway_config() -> VnPayConfig {
    VnPayConfig::new(
        "KOHI0001",
        Secret::new(HMAC_SECRET.to_string()),
        "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
        "https://kohi.example.com/order/payment-return",
    )
}

async fn new_api() -> OrderFlowApi<SqliteDatabase> {
    let _ = env_logger::try_init();
    // In-memory SQLite gives every connection its own private database, so the pool is capped at one connection.
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Could not create database");
    OrderFlowApi::new(db, gateway_config(), EventProducers::default())
}

/// Seeds the catalog with (cà phê sữa đá 29,000₫, bánh mì 45,000₫, phở [unavailable] 65,000₫) and returns the ids.
async fn seed_meals(api: &OrderFlowApi<SqliteDatabase>) -> (i64, i64, i64) {
    let mut conn = api.db().pool().acquire().await.unwrap();
    let ca_phe = meals::insert_meal("Cà phê sữa đá", "Iced milk coffee", Vnd::from(29_000), true, "", &mut conn)
        .await
        .unwrap();
    let banh_mi =
        meals::insert_meal("Bánh mì", "Baguette sandwich", Vnd::from(45_000), true, "", &mut conn).await.unwrap();
    let pho = meals::insert_meal("Phở bò", "Beef noodle soup", Vnd::from(65_000), false, "", &mut conn).await.unwrap();
    (ca_phe, banh_mi, pho)
}

fn parse_query(url: &str) -> HashMap<String, String> {
    let query = url.split_once('?').expect("URL has no query string").1;
    query
        .split('&')
        .map(|pair| {
            let (k, v) = pair.split_once('=').expect("Malformed pair");
            (k.to_string(), urlencoding::decode(v).expect("Invalid encoding").into_owned())
        })
        .collect()
}

/// Signs the parameter set the way the gateway does: empty values dropped, keys sorted, values percent-encoded,
/// HMAC-SHA512 over the joined pairs.
fn sign_params(params: &mut HashMap<String, String>) {
    params.remove("vnp_SecureHash");
    let mut pairs: Vec<(&String, &String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let canonical = pairs.iter().map(|(k, v)| format!("{k}={}", urlencoding::encode(v))).collect::<Vec<_>>().join("&");
    let mut mac = Hmac::<Sha512>::new_from_slice(HMAC_SECRET.as_bytes()).unwrap();
    mac.update(canonical.as_bytes());
    params.insert("vnp_SecureHash".to_string(), hex::encode(mac.finalize().into_bytes()));
}

/// Simulates the gateway redirecting back after payment: takes the issued redirect URL, attaches the outcome
/// fields and re-signs the whole parameter set with the shared secret.
fn gateway_callback(payment_url: &str, response_code: &str) -> HashMap<String, String> {
    let mut params = parse_query(payment_url);
    params.insert("vnp_ResponseCode".to_string(), response_code.to_string());
    params.insert("vnp_BankCode".to_string(), "NCB".to_string());
    params.insert("vnp_TransactionNo".to_string(), "14226112".to_string());
    sign_params(&mut params);
    params
}

#[tokio::test]
async fn create_order_collapses_duplicates_and_drops_unavailable_meals() {
    let api = new_api().await;
    let (ca_phe, banh_mi, pho) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe, ca_phe, pho, ca_phe, banh_mi], CLIENT_IP).await.unwrap();
    // The unavailable phở is dropped and the three coffees collapse into one line item.
    assert_eq!(detail.items.len(), 2);
    let coffee = detail.items.iter().find(|i| i.meal_id == ca_phe).unwrap();
    assert_eq!(coffee.quantity, 3);
    assert_eq!(coffee.price, Vnd::from(29_000));
    let sandwich = detail.items.iter().find(|i| i.meal_id == banh_mi).unwrap();
    assert_eq!(sandwich.quantity, 1);
    assert_eq!(detail.total, Vnd::from(3 * 29_000 + 45_000));
    let url = detail.payment_url.expect("No payment URL was issued");
    let query = parse_query(&url);
    assert_eq!(query.get("vnp_TxnRef").map(String::as_str), Some(detail.id.to_string().as_str()));
    assert_eq!(query.get("vnp_Amount").map(String::as_str), Some("13200000"));
}

#[tokio::test]
async fn orders_with_no_available_meals_are_rejected() {
    let api = new_api().await;
    let (_, _, pho) = seed_meals(&api).await;
    let err = api.create_order(&[], CLIENT_IP).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::EmptyOrder));
    // Unknown ids and unavailable meals filter down to nothing as well.
    let err = api.create_order(&[pho, 999], CLIENT_IP).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::EmptyOrder));
}

#[tokio::test]
async fn line_item_prices_survive_catalog_price_changes() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe, ca_phe], CLIENT_IP).await.unwrap();
    assert_eq!(detail.total, Vnd::from(58_000));
    let mut conn = api.db().pool().acquire().await.unwrap();
    meals::update_meal_price(ca_phe, Vnd::from(40_000), &mut conn).await.unwrap();
    drop(conn);
    // Both the order detail and a refreshed payment URL keep charging the frozen price.
    let detail = api.order_by_id(detail.id).await.unwrap();
    assert_eq!(detail.total, Vnd::from(58_000));
    let url = api.payment_url_for_order(detail.id, CLIENT_IP).await.unwrap();
    let query = parse_query(&url);
    assert_eq!(query.get("vnp_Amount").map(String::as_str), Some("5800000"));
}

#[tokio::test]
async fn successful_callback_settles_once_and_replays_are_no_ops() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    let callback = gateway_callback(detail.payment_url.as_deref().unwrap(), "00");
    let result = api.handle_payment_return(&callback).await.unwrap();
    assert_eq!(result.order_id, detail.id);
    assert!(result.new_settlement);
    assert_eq!(result.payment_status.to_string(), "Paid");
    assert_eq!(result.amount, Some(Vnd::from(29_000)));
    assert_eq!(result.bank_code.as_deref(), Some("NCB"));
    // The gateway delivers at least once. The replay reports the stored outcome without settling again.
    let replay = api.handle_payment_return(&callback).await.unwrap();
    assert!(!replay.new_settlement);
    assert_eq!(replay.payment_status.to_string(), "Paid");
    // A settled order no longer hands out payment URLs.
    let err = api.payment_url_for_order(detail.id, CLIENT_IP).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PaymentNotPending(_)));
}

#[tokio::test]
async fn failed_callback_is_terminal_too() {
    let api = new_api().await;
    let (_, banh_mi, _) = seed_meals(&api).await;
    let detail = api.create_order(&[banh_mi], CLIENT_IP).await.unwrap();
    let url = detail.payment_url.as_deref().unwrap();
    let result = api.handle_payment_return(&gateway_callback(url, "24")).await.unwrap();
    assert!(result.new_settlement);
    assert_eq!(result.payment_status.to_string(), "Failed");
    // A later success callback for the same order must not flip the stored outcome.
    let late = api.handle_payment_return(&gateway_callback(url, "00")).await.unwrap();
    assert!(!late.new_settlement);
    assert_eq!(late.payment_status.to_string(), "Failed");
}

#[tokio::test]
async fn forged_callbacks_leave_the_order_untouched() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    let mut callback = gateway_callback(detail.payment_url.as_deref().unwrap(), "00");
    callback.insert("vnp_Amount".to_string(), "100".to_string());
    let err = api.handle_payment_return(&callback).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidSignature));
    let order = api.order_by_id(detail.id).await.unwrap();
    assert_eq!(order.payment_status.to_string(), "Unpaid");
}

#[tokio::test]
async fn callbacks_for_unknown_orders_are_not_found() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    let mut callback = gateway_callback(detail.payment_url.as_deref().unwrap(), "00");
    callback.insert("vnp_TxnRef".to_string(), "9999".to_string());
    sign_params(&mut callback);
    let err = api.handle_payment_return(&callback).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(9999)));
}

#[tokio::test]
async fn only_one_staff_member_can_claim_an_order() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    let order = api.claim_order(detail.id, 11).await.unwrap();
    assert_eq!(order.staff_id, Some(11));
    let err = api.claim_order(detail.id, 12).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::AlreadyClaimed(_)));
    // Re-claiming your own order is a harmless no-op.
    let order = api.claim_order(detail.id, 11).await.unwrap();
    assert_eq!(order.staff_id, Some(11));
}

#[tokio::test]
async fn simultaneous_claims_have_exactly_one_winner() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    // Two staff members race for the same order. Whatever the interleaving, the conditional update lets exactly
    // one of them through.
    let (first, second) = tokio::join!(api.claim_order(detail.id, 11), api.claim_order(detail.id, 12));
    let (winner, loser) = match (&first, &second) {
        (Ok(_), Err(_)) => (first.unwrap(), second.unwrap_err()),
        (Err(_), Ok(_)) => (second.unwrap(), first.unwrap_err()),
        other => panic!("Expected exactly one winner, got {other:?}"),
    };
    assert!(matches!(loser, OrderFlowError::AlreadyClaimed(_)));
    let order = api.order_by_id(detail.id).await.unwrap();
    assert_eq!(order.staff_id, winner.staff_id);
    assert!(order.staff_id == Some(11) || order.staff_id == Some(12));
}

#[tokio::test]
async fn status_moves_forward_only() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    let err = api.update_order_status(detail.id, 11, OrderStatusType::Completed).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidTransition { .. }));
    let detail = api.update_order_status(detail.id, 11, OrderStatusType::InProgress).await.unwrap();
    assert_eq!(detail.order_status, OrderStatusType::InProgress);
    let detail = api.update_order_status(detail.id, 11, OrderStatusType::Completed).await.unwrap();
    assert_eq!(detail.order_status, OrderStatusType::Completed);
    // Completed is terminal.
    let err = api.update_order_status(detail.id, 11, OrderStatusType::Cancelled).await.unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::InvalidTransition { from: OrderStatusType::Completed, to: OrderStatusType::Cancelled }
    ));
}

#[tokio::test]
async fn stale_status_writes_lose_to_the_transition_that_landed_first() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let detail = api.create_order(&[ca_phe], CLIENT_IP).await.unwrap();
    // Another request moves the order on after this one read it as Pending. The store's conditional update keys on
    // the status the write was validated against, so the stale write matches zero rows.
    let moved =
        api.db().update_order_status(detail.id, OrderStatusType::Pending, OrderStatusType::InProgress).await.unwrap();
    assert!(moved);
    let stale =
        api.db().update_order_status(detail.id, OrderStatusType::Pending, OrderStatusType::Cancelled).await.unwrap();
    assert!(!stale);
    let order = api.order_by_id(detail.id).await.unwrap();
    assert_eq!(order.order_status, OrderStatusType::InProgress);
    // The workflow reports the conflict against the status the order actually has now.
    let err = api.update_order_status(detail.id, 11, OrderStatusType::InProgress).await.unwrap_err();
    assert!(matches!(
        err,
        OrderFlowError::InvalidTransition { from: OrderStatusType::InProgress, to: OrderStatusType::InProgress }
    ));
}

#[tokio::test]
async fn pagination_and_claim_filters() {
    let api = new_api().await;
    let (ca_phe, _, _) = seed_meals(&api).await;
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(api.create_order(&[ca_phe], CLIENT_IP).await.unwrap().id);
    }
    let page1 = api.fetch_orders(Pagination::new(1, 2), None).await.unwrap();
    assert_eq!(page1.page, 1);
    assert_eq!(page1.size, 2);
    assert_eq!(page1.orders.iter().map(|o| o.id).collect::<Vec<_>>(), ids[..2]);
    // Listed orders carry their resolved line items, not bare rows.
    assert_eq!(page1.orders[0].items.len(), 1);
    assert_eq!(page1.orders[0].items[0].name, "Cà phê sữa đá");
    assert_eq!(page1.orders[0].total, Vnd::from(29_000));
    let page3 = api.fetch_orders(Pagination::new(3, 2), None).await.unwrap();
    assert_eq!(page3.orders.len(), 1);
    // A page past the end is empty, never an error.
    let page4 = api.fetch_orders(Pagination::new(4, 2), None).await.unwrap();
    assert!(page4.orders.is_empty());
    assert_eq!(page4.page, 4);
    api.claim_order(ids[2], 7).await.unwrap();
    let claimed = api.fetch_orders(Pagination::default(), Some(true)).await.unwrap();
    assert_eq!(claimed.orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![ids[2]]);
    let unclaimed = api.fetch_orders(Pagination::default(), Some(false)).await.unwrap();
    assert_eq!(unclaimed.orders.len(), 4);
}

#[tokio::test]
async fn missing_orders_are_reported_as_not_found() {
    let api = new_api().await;
    seed_meals(&api).await;
    let err = api.order_by_id(999).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(999)));
    let err = api.claim_order(999, 1).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::OrderNotFound(999)));
}
