use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use hmac::{Hmac, Mac};
use log::debug;
use serde_json::Value;
use sha2::Sha256;
use synqsell_engine::{
    test_utils::{
        fakes::{FakePayments, FakeStore},
        prepare_env::fresh_database,
    },
    EngineConfig,
    EventCoordinator,
    RetryPolicy,
    SqliteDatabase,
};

use crate::{
    config::{QueueConfig, ShopifyConfig, StripeWebhookConfig},
    helpers::calculate_hmac,
    server::configure_app,
};

pub const SHOPIFY_SECRET: &str = "shpss_endpoint_tests";
pub const STRIPE_SECRET: &str = "whsec_endpoint_tests";
pub const QUEUE_SECRET: &str = "queue_endpoint_tests";

pub type Coordinator = EventCoordinator<SqliteDatabase, FakeStore, FakePayments>;

pub struct TestApp {
    pub coordinator: web::Data<Coordinator>,
    pub store: FakeStore,
    pub payments: FakePayments,
}

/// A coordinator over a fresh database and in-memory store and payment fakes. Remote calls are not retried.
pub async fn test_app() -> TestApp {
    let db = fresh_database().await;
    let store = FakeStore::new();
    let payments = FakePayments::new();
    let config = EngineConfig::default().with_retry(RetryPolicy::immediate(0));
    let coordinator = web::Data::new(EventCoordinator::new(db, store.clone(), payments.clone(), config));
    TestApp { coordinator, store, payments }
}

pub fn shopify_config() -> ShopifyConfig {
    ShopifyConfig { api_secret: SHOPIFY_SECRET.into(), hmac_checks: true }
}

pub fn queue_config() -> QueueConfig {
    QueueConfig { secret: QUEUE_SECRET.into() }
}

pub fn stripe_webhook_config() -> StripeWebhookConfig {
    StripeWebhookConfig { secret: STRIPE_SECRET.into(), tolerance_secs: 300 }
}

/// Sends `req` through the full app and returns the status and body. Errors raised by middleware are converted to
/// their response status.
pub async fn send(app: &TestApp, req: TestRequest) -> (StatusCode, String) {
    send_with(app, queue_config(), req).await
}

/// As [`send`], with a specific queue configuration.
pub async fn send_with(app: &TestApp, queue: QueueConfig, req: TestRequest) -> (StatusCode, String) {
    let configure = configure_app(app.coordinator.clone(), shopify_config(), queue, stripe_webhook_config());
    let service = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

/// A Shopify webhook delivery with a valid signature.
pub fn shopify_request(topic: &str, shop: &str, webhook_id: &str, payload: &Value) -> TestRequest {
    let body = payload.to_string();
    let hmac = calculate_hmac(SHOPIFY_SECRET, body.as_bytes());
    TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header(("X-Shopify-Topic", topic))
        .insert_header(("X-Shopify-Shop-Domain", shop))
        .insert_header(("X-Shopify-Webhook-Id", webhook_id))
        .insert_header(("X-Shopify-Hmac-Sha256", hmac))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
}

/// An event batch signed with the queue secret.
pub fn batch_request(events: &Value) -> TestRequest {
    signed_batch_request(events, QUEUE_SECRET)
}

pub fn signed_batch_request(events: &Value, secret: &str) -> TestRequest {
    let body = events.to_string();
    TestRequest::post()
        .uri("/events/batch")
        .insert_header(("X-Synq-Hmac-Sha256", calculate_hmac(secret, body.as_bytes())))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
}

/// The `Stripe-Signature` header for `body`, signed now.
pub fn stripe_signature(body: &str, secret: &str) -> String {
    let ts = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{ts}.{body}").as_bytes());
    format!("t={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
}
