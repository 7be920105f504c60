use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;
use synqsell_engine::IdempotencyLedger;

use super::helpers::*;

fn stripe_request(body: &str, signature: &str) -> TestRequest {
    TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header(("Stripe-Signature", signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

fn intent_event(id: &str, event_type: &str, intent_id: &str) -> String {
    json!({
        "id": id,
        "type": event_type,
        "data": { "object": { "object": "payment_intent", "id": intent_id, "status": "succeeded", "amount": 4400,
            "currency": "usd" } }
    })
    .to_string()
}

#[actix_web::test]
async fn signed_events_reach_the_engine() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let body = intent_event("evt_stripe_1", "payment_intent.succeeded", "pi_unknown");

    let (status, body) = send(&app, stripe_request(&body, &stripe_signature(&body, STRIPE_SECRET))).await;
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let report = json_body(&body);
    assert_eq!(report["event_id"], "evt_stripe_1");
    // No payment was ever initiated for this intent
    assert_eq!(report["status"], "skipped");
    assert!(app.coordinator.db().has_processed("evt_stripe_1").await.unwrap());
}

#[actix_web::test]
async fn bad_signatures_are_refused() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let body = intent_event("evt_stripe_2", "payment_intent.succeeded", "pi_1");

    let (status, _) = send(&app, stripe_request(&body, &stripe_signature(&body, "whsec_wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, stripe_request(&body, "t=1,v1=00")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let missing = TestRequest::post().uri("/stripe/webhook").set_payload(body.clone());
    let (status, _) = send(&app, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!app.coordinator.db().has_processed("evt_stripe_2").await.unwrap());
}

#[actix_web::test]
async fn other_event_types_are_ignored() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let body = json!({ "id": "evt_3", "type": "customer.created", "data": { "object": { "object": "customer" } } })
        .to_string();
    let (status, body) = send(&app, stripe_request(&body, &stripe_signature(&body, STRIPE_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["status"], "ignored_topic");
    assert_eq!(app.payments.state().requests, 0);
}

#[actix_web::test]
async fn store_topics_are_not_accepted_from_stripe() {
    let _ = env_logger::try_init().ok();
    let app = test_app().await;
    let body = json!({ "id": "evt_4", "type": "shop/redact", "data": { "object": {} } }).to_string();
    let (status, body) = send(&app, stripe_request(&body, &stripe_signature(&body, STRIPE_SECRET))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("shop/redact"), "was: {body}");
    assert!(!app.coordinator.db().has_processed("evt_4").await.unwrap());
}
