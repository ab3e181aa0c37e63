use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use quickcart_engine::{sqlite::db::run_migrations, OrderFlowApi, SqliteDatabase};
use stripe_tools::StripeApi;

use crate::{
    auth::JwtService,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AuthRoute,
        ConfirmOrderRoute,
        DeleteOrderRoute,
        NewOrderRoute,
        OrderByIdRoute,
        RefreshOrderRoute,
        SearchOrdersRoute,
        UpdateOrderRemarkRoute,
        UpdateOrderStatusRoute,
    },
    stripe_routes::StripeWebhookRoute,
    integrations::stripe::StripeGateway,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    run_migrations(db.pool()).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let api = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = StripeGateway::new(api);
    // The status registry must be seeded before the first request arrives.
    let orders_api = OrderFlowApi::new(db.clone(), gateway.clone());
    orders_api.bootstrap().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database ready at {}", db.url());
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: StripeGateway,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), gateway.clone());
        let jwt = JwtService::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("qcs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(jwt));
        // Fixed segments before parameterised ones, so /orders/confirm is never captured by /orders/{order_id}.
        let api_scope = web::scope("/api")
            .service(SearchOrdersRoute::<SqliteDatabase, StripeGateway>::new())
            .service(ConfirmOrderRoute::<SqliteDatabase, StripeGateway>::new())
            .service(NewOrderRoute::<SqliteDatabase, StripeGateway>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase, StripeGateway>::new())
            .service(UpdateOrderRemarkRoute::<SqliteDatabase, StripeGateway>::new())
            .service(RefreshOrderRoute::<SqliteDatabase, StripeGateway>::new())
            .service(OrderByIdRoute::<SqliteDatabase, StripeGateway>::new())
            .service(DeleteOrderRoute::<SqliteDatabase, StripeGateway>::new());
        let webhook_scope =
            web::scope("/webhook").service(StripeWebhookRoute::<SqliteDatabase, StripeGateway>::new());
        app.service(health).service(AuthRoute::new()).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
