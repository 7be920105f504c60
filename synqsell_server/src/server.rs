use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use store_gateway::{ShopifyGateway, StoreApi};
use stripe_tools::{PaymentProcessor, StripeClient};
use synqsell_engine::{EventCoordinator, SqliteDatabase, SynqsellDatabase};

use crate::{
    config::{QueueConfig, ServerConfig, ShopifyConfig, StripeWebhookConfig},
    errors::ServerError,
    middleware::{HmacMiddlewareFactory, QUEUE_HMAC_HEADER, SHOPIFY_HMAC_HEADER},
    routes::{health, EventBatchRoute, ShopifyWebhookRoute, StripeWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let gateway = ShopifyGateway::new(config.gateway_config.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Shopify gateway. {e}")))?;
    let stripe = StripeClient::new(config.stripe_config.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Stripe client. {e}")))?;
    let stripe_webhook = StripeWebhookConfig::from_config(&config.stripe_config);
    let shopify_config = config.shopify_config.clone();
    let queue_config = config.queue_config.clone();
    let engine_config = config.engine_config.clone();
    info!(
        "🚀️ Platform fee is {} bps. Remote calls are retried up to {} times.",
        engine_config.platform_fee_bps, engine_config.retry.max_retries
    );
    let srv = HttpServer::new(move || {
        let coordinator = EventCoordinator::new(db.clone(), gateway.clone(), stripe.clone(), engine_config.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("synqsell::access_log"))
            .configure(configure_app(
                web::Data::new(coordinator),
                shopify_config.clone(),
                queue_config.clone(),
                stripe_webhook.clone(),
            ))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route against `coordinator`. The Shopify and event batch scopes are guarded by the HMAC
/// middleware; Stripe deliveries are verified in their handler.
pub fn configure_app<B, S, P>(
    coordinator: web::Data<EventCoordinator<B, S, P>>,
    shopify_config: ShopifyConfig,
    queue_config: QueueConfig,
    stripe_webhook: StripeWebhookConfig,
) -> impl FnOnce(&mut web::ServiceConfig)
where
    B: SynqsellDatabase + 'static,
    S: StoreApi + 'static,
    P: PaymentProcessor + 'static,
{
    move |cfg| {
        let shopify_scope = web::scope("/shopify")
            .wrap(HmacMiddlewareFactory::new(SHOPIFY_HMAC_HEADER, shopify_config.api_secret, shopify_config.hmac_checks))
            .service(ShopifyWebhookRoute::<B, S, P>::new());
        let events_scope = web::scope("/events")
            .wrap(HmacMiddlewareFactory::new(QUEUE_HMAC_HEADER, queue_config.secret, true))
            .service(EventBatchRoute::<B, S, P>::new());
        cfg.app_data(coordinator)
            .app_data(web::Data::new(stripe_webhook))
            .service(health)
            .service(StripeWebhookRoute::<B, S, P>::new())
            .service(events_scope)
            .service(shopify_scope);
    }
}
