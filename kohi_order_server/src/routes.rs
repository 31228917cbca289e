//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) should be expressed as futures or asynchronous functions. Async handlers get executed
//! concurrently by worker threads and thus don't block execution.
use std::collections::HashMap;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use kohi_order_engine::{
    traits::{MealCatalog, OrderManagementDatabase},
    OrderFlowApi,
};
use log::*;
use serde_json::json;

use crate::{
    config::ProxyConfig,
    data_objects::{ClaimOrderRequest, CreateOrderRequest, OrderQueryParams, UpdateOrderStatusRequest},
    errors::ServerError,
    helpers::client_ip_or_localhost,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/order" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the order creation endpoint
///
/// Customers POST the meal ids they want (repeats collapse into quantities). The response is the full order detail,
/// including the signed VNPay redirect URL for the payable total. Unknown and unavailable meals are dropped; an
/// order with nothing left is rejected with a 400.
pub async fn create_order<A: OrderManagementDatabase + MealCatalog>(
    req: HttpRequest,
    proxy: web::Data<ProxyConfig>,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let ip = client_ip_or_localhost(&req, proxy.use_x_forwarded_for, proxy.use_forwarded);
    debug!("💻️ POST order for {} meal id(s) from {ip}", body.meals.len());
    let detail = api.create_order(&body.meals, &ip).await?;
    Ok(HttpResponse::Created().json(detail))
}

route!(payment_url => Get "/order/payment-url/{order_id}" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the payment URL endpoint
///
/// Re-issues the signed gateway redirect URL for an order whose payment is still pending. The amount comes from the
/// frozen line items; the timestamp is fresh, so a customer whose earlier URL expired can try again.
pub async fn payment_url<A: OrderManagementDatabase + MealCatalog>(
    req: HttpRequest,
    proxy: web::Data<ProxyConfig>,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let ip = client_ip_or_localhost(&req, proxy.use_x_forwarded_for, proxy.use_forwarded);
    debug!("💻️ GET payment URL for order #{order_id}");
    let url = api.payment_url_for_order(order_id, &ip).await?;
    Ok(HttpResponse::Ok().json(json!({ "order_id": order_id, "payment_url": url })))
}

route!(payment_return => Get "/order/payment-return" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the gateway return callback
///
/// VNPay redirects the customer's browser here after payment. The whole query string is handed to the engine, which
/// verifies the HMAC signature before any order state is touched. Replays of an already-processed callback return
/// the stored outcome with `new_settlement: false`.
pub async fn payment_return<A: OrderManagementDatabase + MealCatalog>(
    query: web::Query<HashMap<String, String>>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment return callback");
    let result = api.handle_payment_return(&query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(claim_order => Put "/order/claim" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the claim endpoint
///
/// Assigns the order to the requesting staff member. The claim is exclusive: once an order is claimed, other staff
/// members get a 409. Claiming an order you already hold is a no-op success.
pub async fn claim_order<A: OrderManagementDatabase + MealCatalog>(
    body: web::Json<ClaimOrderRequest>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PUT claim on order #{} by staff #{}", body.order_id, body.staff_id);
    let order = api.claim_order(body.order_id, body.staff_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_status => Put "/order/status" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the status update endpoint
///
/// Moves the order along the staff lifecycle. Only the legal forward transitions are accepted; anything else is a
/// 409 that names the offending pair.
pub async fn update_status<A: OrderManagementDatabase + MealCatalog>(
    body: web::Json<UpdateOrderStatusRequest>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ PUT status {} on order #{} by staff #{}", body.status, body.order_id, body.staff_id);
    let detail = api.update_order_status(body.order_id, body.staff_id, body.status).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(order_by_id => Get "/order/{order_id}" impl OrderManagementDatabase, MealCatalog);
/// Route handler for fetching a single order, with its line items resolved against the catalog.
pub async fn order_by_id<A: OrderManagementDatabase + MealCatalog>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id}");
    let detail = api.order_by_id(order_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(orders => Get "/orders" impl OrderManagementDatabase, MealCatalog);
/// Route handler for the paginated order listing
///
/// The staff dashboard polls this endpoint. `page` and `size` control pagination, `claimed` filters on whether an
/// order has been picked up by a staff member. The response is a page envelope echoing `page` and `size`, with each
/// order carrying its resolved line items. Invalid parameters yield a single 400 naming every violation.
pub async fn orders<A: OrderManagementDatabase + MealCatalog>(
    query: web::Query<OrderQueryParams>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let (pagination, claimed) = query.validate().map_err(ServerError::InvalidRequestBody)?;
    debug!("💻️ GET orders page {} (size {}, claimed filter {claimed:?})", pagination.page, pagination.size);
    let orders = api.fetch_orders(pagination, claimed).await?;
    Ok(HttpResponse::Ok().json(orders))
}
