use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use kohi_order_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderFlowApi,
    SqliteDatabase,
};
use log::info;

use crate::{
    config::{ProxyConfig, ServerConfig},
    errors::ServerError,
    routes::{
        health,
        ClaimOrderRoute,
        CreateOrderRoute,
        OrderByIdRoute,
        OrdersRoute,
        PaymentReturnRoute,
        PaymentUrlRoute,
        UpdateStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, staff_notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default event subscribers: every order-flow event lands in the log, where the staff dashboard tail picks
/// them up. Deployments with a push channel can register their own hooks instead.
pub fn staff_notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_new_order(|ev| {
        Box::pin(async move {
            info!("📬️ New order #{} is waiting to be claimed", ev.order.id);
        })
    });
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("📬️ Order #{} has been paid. The kitchen can start on it.", ev.order.id);
        })
    });
    hooks.on_status_changed(|ev| {
        Box::pin(async move {
            info!("📬️ Order #{} moved from {} to {}", ev.order.id, ev.old_status, ev.order.order_status);
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), config.vnpay.clone(), producers.clone());
        let proxy_config = ProxyConfig::from(&config);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kos::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(proxy_config))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(PaymentUrlRoute::<SqliteDatabase>::new())
            .service(PaymentReturnRoute::<SqliteDatabase>::new())
            .service(ClaimOrderRoute::<SqliteDatabase>::new())
            .service(UpdateStatusRoute::<SqliteDatabase>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            // Registered last so that the fixed /order/... routes above win the match.
            .service(OrderByIdRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
