use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use store_gateway::GatewayError;
use synqsell_engine::{
    events::Topic,
    test_utils::seed::{envelope, routing_complete, standard_scenario, RETAILER_SHOP, SUPPLIER_SHOP},
    IdempotencyLedger,
    SessionManagement,
};

use super::helpers::*;
use crate::config::QueueConfig;

#[actix_web::test]
async fn batch_reports_every_message() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let scenario = standard_scenario(app.coordinator.db(), &app.store).await;
    let events = json!([
        envelope("q-1", Topic::OrderRoutingComplete, RETAILER_SHOP, routing_complete(&scenario.fulfillment_order_id)),
        envelope("q-2", Topic::ProductDeleted, SUPPLIER_SHOP, json!({ "id": 404 })),
        { "event_id": "q-3", "topic": "carts/update", "shop": RETAILER_SHOP, "payload": {} },
        { "topic": "products/delete" },
    ]);

    let (status, body) = send(&app, batch_request(&events)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let report = json_body(&body);
    assert_eq!(report["processed"], json!(["q-1"]));
    assert_eq!(report["skipped"], json!(["q-2"]));
    assert_eq!(report["ignored"], json!(["q-3"]));
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);
    assert!(report["failed"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn retryable_failures_fail_the_batch() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let scenario = standard_scenario(app.coordinator.db(), &app.store).await;
    app.store.fail("fetch_fulfillment_order", GatewayError::RemoteApi { status: 503, messages: vec![] }, 1);
    let events = json!([
        envelope("q-1", Topic::OrderRoutingComplete, RETAILER_SHOP, routing_complete(&scenario.fulfillment_order_id)),
        envelope("q-2", Topic::CustomersRedact, RETAILER_SHOP, json!({})),
    ]);

    let (status, body) = send(&app, batch_request(&events)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let report = json_body(&body);
    assert_eq!(report["failed"][0]["event_id"], "q-1");
    assert_eq!(report["failed"][0]["retryable"], true);
    assert_eq!(report["processed"], json!(["q-2"]));

    // The queue re-delivers the whole batch
    let (status, body) = send(&app, batch_request(&events)).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let report = json_body(&body);
    assert_eq!(report["processed"], json!(["q-1"]));
    assert_eq!(report["already_processed"], json!(["q-2"]));
}

#[actix_web::test]
async fn non_array_bodies_are_refused() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let (status, _) = send(&app, batch_request(&json!({ "event_id": "q-1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unsigned_batches_are_refused() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    standard_scenario(app.coordinator.db(), &app.store).await;
    let events = json!([envelope("anon-1", Topic::ShopRedact, SUPPLIER_SHOP, json!({}))]);

    let unsigned = TestRequest::post().uri("/events/batch").set_json(&events);
    let (status, _) = send(&app, unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, signed_batch_request(&events, "not-the-queue-secret")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let db = app.coordinator.db();
    assert!(!db.has_processed("anon-1").await.unwrap());
    assert!(db.fetch_session_by_shop(SUPPLIER_SHOP).await.unwrap().is_some());
}

#[actix_web::test]
async fn batches_are_refused_without_a_queue_secret() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let events = json!([envelope("q-1", Topic::CustomersRedact, RETAILER_SHOP, json!({}))]);
    // Signed with the empty key the server would otherwise accept
    let (status, _) = send_with(&app, QueueConfig::default(), signed_batch_request(&events, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!app.coordinator.db().has_processed("q-1").await.unwrap());
}
