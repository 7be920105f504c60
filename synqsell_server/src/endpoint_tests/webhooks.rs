use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use store_gateway::GatewayError;
use synqsell_engine::{
    events::Topic,
    test_utils::seed::{routing_complete, standard_scenario, RETAILER_SHOP, SUPPLIER_SHOP},
    IdempotencyLedger,
    OrderManagement,
};

use super::helpers::*;
use crate::helpers::calculate_hmac;

#[actix_web::test]
async fn routing_webhook_creates_the_supplier_order() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let scenario = standard_scenario(app.coordinator.db(), &app.store).await;
    let payload = routing_complete(&scenario.fulfillment_order_id);
    let topic = Topic::OrderRoutingComplete.as_str();

    let (status, body) = send(&app, shopify_request(topic, RETAILER_SHOP, "wh-1", &payload)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let report = json_body(&body);
    assert_eq!(report["status"], "processed");
    assert_eq!(report["event_id"], "wh-1");
    assert_eq!(app.store.state().orders_for(SUPPLIER_SHOP).len(), 1);
    let orders = app.coordinator.db().fetch_orders_for_fulfillment_order(&scenario.fulfillment_order_id).await.unwrap();
    assert_eq!(orders.len(), 1);

    // Shopify re-delivers with the same webhook id
    let (status, body) = send(&app, shopify_request(topic, RETAILER_SHOP, "wh-1", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "already_processed");
    assert_eq!(app.store.state().orders_for(SUPPLIER_SHOP).len(), 1);
}

#[actix_web::test]
async fn unsigned_or_forged_webhooks_are_refused() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let payload = json!({ "id": 1 });

    let unsigned = TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header(("X-Shopify-Topic", "products/delete"))
        .insert_header(("X-Shopify-Shop-Domain", SUPPLIER_SHOP))
        .insert_header(("X-Shopify-Webhook-Id", "wh-unsigned"))
        .set_payload(payload.to_string());
    let (status, _) = send(&app, unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header(("X-Shopify-Topic", "products/delete"))
        .insert_header(("X-Shopify-Shop-Domain", SUPPLIER_SHOP))
        .insert_header(("X-Shopify-Webhook-Id", "wh-forged"))
        .insert_header(("X-Shopify-Hmac-Sha256", calculate_hmac("not-the-secret", payload.to_string().as_bytes())))
        .set_payload(payload.to_string());
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let db = app.coordinator.db();
    assert!(!db.has_processed("wh-unsigned").await.unwrap());
    assert!(!db.has_processed("wh-forged").await.unwrap());
}

#[actix_web::test]
async fn missing_headers_and_bad_bodies_are_client_errors() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let body = "{}";
    let no_topic = TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header(("X-Shopify-Shop-Domain", SUPPLIER_SHOP))
        .insert_header(("X-Shopify-Webhook-Id", "wh-1"))
        .insert_header(("X-Shopify-Hmac-Sha256", calculate_hmac(SHOPIFY_SECRET, body.as_bytes())))
        .set_payload(body);
    let (status, body) = send(&app, no_topic).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("X-Shopify-Topic"), "was: {body}");

    let not_json = "not json";
    let req = TestRequest::post()
        .uri("/shopify/webhook")
        .insert_header(("X-Shopify-Topic", "products/delete"))
        .insert_header(("X-Shopify-Shop-Domain", SUPPLIER_SHOP))
        .insert_header(("X-Shopify-Webhook-Id", "wh-2"))
        .insert_header(("X-Shopify-Hmac-Sha256", calculate_hmac(SHOPIFY_SECRET, not_json.as_bytes())))
        .set_payload(not_json);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unsupported_topics_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let (status, body) = send(&app, shopify_request("carts/update", RETAILER_SHOP, "wh-cart", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "ignored_topic");
}

#[actix_web::test]
async fn transient_failures_ask_shopify_to_retry() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let scenario = standard_scenario(app.coordinator.db(), &app.store).await;
    app.store.fail("create_order", GatewayError::RemoteApi { status: 502, messages: vec!["bad gateway".into()] }, 1);
    let payload = routing_complete(&scenario.fulfillment_order_id);
    let topic = Topic::OrderRoutingComplete.as_str();

    let (status, body) = send(&app, shopify_request(topic, RETAILER_SHOP, "wh-1", &payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let report = json_body(&body);
    assert_eq!(report["status"], "failed");
    assert_eq!(report["retryable"], true);

    let (status, body) = send(&app, shopify_request(topic, RETAILER_SHOP, "wh-1", &payload)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    assert_eq!(json_body(&body)["status"], "processed");
}

#[actix_web::test]
async fn permanent_failures_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let scenario = standard_scenario(app.coordinator.db(), &app.store).await;
    app.store.fail("create_order", GatewayError::UserErrors { messages: vec!["lineItems: is invalid".into()] }, 1);
    let payload = routing_complete(&scenario.fulfillment_order_id);

    let req = shopify_request(Topic::OrderRoutingComplete.as_str(), RETAILER_SHOP, "wh-1", &payload);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let report = json_body(&body);
    assert_eq!(report["status"], "failed");
    assert_eq!(report["retryable"], false);
}

#[actix_web::test]
async fn payment_topics_are_not_accepted_from_shopify() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let payload = json!({ "data": { "object": { "object": "payment_intent", "id": "pi_forged" } } });
    for topic in [Topic::PaymentSucceeded, Topic::PaymentFailed] {
        let event_id = format!("wh-{}", topic.as_str());
        let (status, body) = send(&app, shopify_request(topic.as_str(), RETAILER_SHOP, &event_id, &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains(topic.as_str()), "was: {body}");
        assert!(!app.coordinator.db().has_processed(&event_id).await.unwrap());
    }
}
