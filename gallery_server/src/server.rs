use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gallery_engine::{events::EventProducers, OrderFlowApi, OrdersApi, SqliteDatabase};
use log::info;
use stripe_tools::StripeApi;

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::mailer::create_mailer_event_handlers,
    middleware::{new_checkout_rate_limiter, SignatureMiddlewareFactory},
    routes::{checkout, health, my_orders, order_by_id, orders, update_order},
    stripe_routes::stripe_webhook,
};

const DB_POOL_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_POOL_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers =
        create_mailer_event_handlers(&config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = handlers.producers();
    tokio::spawn(handlers.run());
    info!("🚀️ Notification handlers started");
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe_api =
        StripeApi::new(config.stripe_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let rate_limiter = new_checkout_rate_limiter(&config.rate_limit);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = OrderFlowApi::new(db.clone(), producers.clone());
        let orders_api = OrdersApi::new(db.clone());
        let token_issuer = TokenIssuer::new(&config.auth);
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gps::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(stripe_api.clone()))
            .app_data(web::Data::new(token_issuer))
            .app_data(web::Data::new(options))
            .app_data(web::Data::from(rate_limiter.clone()));
        // Dashboard routes: authorization happens in the handlers via JwtClaims extraction.
        let api_scope = web::scope("/api")
            .service(orders)
            .service(my_orders)
            .service(order_by_id)
            .service(update_order);
        // Provider webhooks: every request through this scope is signature-checked first.
        let webhook_secret = config.stripe_config.webhook_secret.clone();
        let webhook_scope = web::scope("/stripe")
            .wrap(SignatureMiddlewareFactory::new(webhook_secret, config.signature_checks))
            .service(stripe_webhook);
        app.service(health).service(checkout).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
