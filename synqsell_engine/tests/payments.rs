use serde_json::{json, Value};
use store_gateway::StoreOrder;
use stripe_tools::PaymentIntentStatus;
use synqsell_engine::{
    db_types::{PaymentRecordStatus, PaymentStatus},
    events::Topic,
    lifecycle::OrderLifecycle,
    test_utils::{
        fakes::{FakePayments, FakeStore},
        prepare_env::fresh_database,
        seed::*,
    },
    EngineConfig,
    EventCoordinator,
    FulfillmentManagement,
    OrderManagement,
    PaymentManagement,
    RetryPolicy,
    SqliteDatabase,
};

type Coordinator = EventCoordinator<SqliteDatabase, FakeStore, FakePayments>;

struct Routed {
    coordinator: Coordinator,
    payments: FakePayments,
    supplier_order: StoreOrder,
    order_id: i64,
}

async fn routed_order() -> Routed {
    let db = fresh_database().await;
    let store = FakeStore::new();
    let payments = FakePayments::new();
    let config = EngineConfig::default().with_retry(RetryPolicy::immediate(0));
    let coordinator = EventCoordinator::new(db, store.clone(), payments.clone(), config);
    let scenario = standard_scenario(coordinator.db(), &store).await;
    let route =
        envelope("evt-route", Topic::OrderRoutingComplete, RETAILER_SHOP, routing_complete(&scenario.fulfillment_order_id));
    let report = coordinator.process_batch(vec![route]).await;
    assert_eq!(report.processed.len(), 1);
    let supplier_order = store.state().orders_for(SUPPLIER_SHOP)[0].order.clone();
    let order_id = coordinator.db().fetch_orders_for_fulfillment_order(&scenario.fulfillment_order_id).await.unwrap()[0].id;
    Routed { coordinator, payments, supplier_order, order_id }
}

fn intent_event(event_id: &str, topic: Topic, intent_id: &str, status: &str) -> Value {
    let event = json!({
        "id": event_id,
        "type": topic.as_str(),
        "data": { "object": { "object": "payment_intent", "id": intent_id, "status": status, "amount": 4400,
            "currency": "usd" } }
    });
    envelope(event_id, topic, "", event)
}

/// A supplier fulfillment covering only the `index`th line of `order`.
fn single_line_fulfillment(id: u64, order: &StoreOrder, index: usize, shipment_status: Option<&str>) -> Value {
    let mut snapshot = fulfillment_snapshot(id, order, "success", shipment_status);
    let line = &order.line_items[index];
    snapshot["line_items"] = json!([{ "id": line.id, "quantity": line.quantity }]);
    snapshot
}

async fn lifecycle(coordinator: &Coordinator, order_id: i64) -> OrderLifecycle {
    let db = coordinator.db();
    let order = db.fetch_order(order_id).await.unwrap().unwrap();
    let fulfillments = db.fetch_fulfillments_for_order(order_id).await.unwrap();
    let payments = db.fetch_payments_for_order(order_id).await.unwrap();
    OrderLifecycle::derive(&order, &fulfillments, &payments)
}

#[tokio::test]
async fn confirmation_completes_an_initiated_payment() {
    let Routed { coordinator, payments, supplier_order, order_id } = routed_order().await;
    let db = coordinator.db();
    payments.set_next_status(PaymentIntentStatus::Processing);
    let shipped = fulfillment_snapshot(8001, &supplier_order, "success", None);
    let delivered = fulfillment_snapshot(8001, &supplier_order, "success", Some("delivered"));
    let report = coordinator
        .process_batch(vec![envelope("evt-ful-1", Topic::FulfillmentCreated, SUPPLIER_SHOP, shipped)])
        .await;
    assert_eq!(report.processed.len(), 1, "{report:?}");
    let report = coordinator
        .process_batch(vec![envelope("evt-ful-2", Topic::FulfillmentUpdated, SUPPLIER_SHOP, delivered)])
        .await;
    assert_eq!(report.processed.len(), 1, "{report:?}");

    let payment = db.fetch_payment_by_intent("pi_1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentRecordStatus::Initiated);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().payment_status, PaymentStatus::Incomplete);
    assert_eq!(lifecycle(&coordinator, order_id).await, OrderLifecycle::DeliveredPaymentInitiated);

    let report =
        coordinator.process_batch(vec![intent_event("evt_pi_ok", Topic::PaymentSucceeded, "pi_1", "succeeded")]).await;
    assert_eq!(report.processed, vec!["evt_pi_ok".to_string()]);
    let payment = db.fetch_payment_by_intent("pi_1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentRecordStatus::Succeeded);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().payment_status, PaymentStatus::Paid);
    assert_eq!(lifecycle(&coordinator, order_id).await, OrderLifecycle::Paid);
    assert_eq!(payments.state().charges.len(), 1);
}

#[tokio::test]
async fn failed_payments_are_not_charged_again() {
    let Routed { coordinator, payments, supplier_order, order_id } = routed_order().await;
    let db = coordinator.db();
    payments.set_next_status(PaymentIntentStatus::Processing);
    let shipped = fulfillment_snapshot(8001, &supplier_order, "success", None);
    let delivered = fulfillment_snapshot(8001, &supplier_order, "success", Some("delivered"));
    coordinator.process_batch(vec![envelope("evt-ful-1", Topic::FulfillmentCreated, SUPPLIER_SHOP, shipped)]).await;
    coordinator
        .process_batch(vec![envelope("evt-ful-2", Topic::FulfillmentUpdated, SUPPLIER_SHOP, delivered.clone())])
        .await;
    assert_eq!(db.fetch_payment_by_intent("pi_1").await.unwrap().unwrap().status, PaymentRecordStatus::Initiated);

    let failed = intent_event("evt_pi_fail", Topic::PaymentFailed, "pi_1", "requires_payment_method");
    let report = coordinator.process_batch(vec![failed]).await;
    assert_eq!(report.processed, vec!["evt_pi_fail".to_string()]);
    let payment = db.fetch_payment_by_intent("pi_1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentRecordStatus::Failed);

    // A second failure notice for the same intent changes nothing
    let again = intent_event("evt_pi_fail_2", Topic::PaymentFailed, "pi_1", "requires_payment_method");
    let report = coordinator.process_batch(vec![again]).await;
    assert_eq!(report.skipped, vec!["evt_pi_fail_2".to_string()]);

    // The supplier's store re-sends the delivery under a new id
    let report =
        coordinator.process_batch(vec![envelope("evt-ful-3", Topic::FulfillmentUpdated, SUPPLIER_SHOP, delivered)]).await;
    assert_eq!(report.skipped, vec!["evt-ful-3".to_string()]);
    assert_eq!(payments.state().requests, 1);
    assert_eq!(db.fetch_payments_for_order(order_id).await.unwrap().len(), 1);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().payment_status, PaymentStatus::Incomplete);
}

#[tokio::test]
async fn one_paid_fulfillment_of_two_is_partially_paid() {
    let Routed { coordinator, payments, supplier_order, order_id } = routed_order().await;
    let db = coordinator.db();
    let first = single_line_fulfillment(8001, &supplier_order, 0, None);
    let second = single_line_fulfillment(8002, &supplier_order, 1, None);
    let first_delivered = single_line_fulfillment(8001, &supplier_order, 0, Some("delivered"));
    for (event_id, snapshot) in [("evt-ful-a", first), ("evt-ful-b", second)] {
        let report =
            coordinator.process_batch(vec![envelope(event_id, Topic::FulfillmentCreated, SUPPLIER_SHOP, snapshot)]).await;
        assert_eq!(report.processed.len(), 1, "{report:?}");
    }
    assert_eq!(db.fetch_fulfillments_for_order(order_id).await.unwrap().len(), 2);

    let report = coordinator
        .process_batch(vec![envelope("evt-ful-a2", Topic::FulfillmentUpdated, SUPPLIER_SHOP, first_delivered)])
        .await;
    assert_eq!(report.processed, vec!["evt-ful-a2".to_string()]);
    assert_eq!(payments.state().charges.len(), 1);
    assert_eq!(payments.state().charges[0].amount.value(), 3 * 800);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().payment_status, PaymentStatus::PartiallyPaid);

    let second_delivered = single_line_fulfillment(8002, &supplier_order, 1, Some("delivered"));
    let report = coordinator
        .process_batch(vec![envelope("evt-ful-b2", Topic::FulfillmentUpdated, SUPPLIER_SHOP, second_delivered)])
        .await;
    assert_eq!(report.processed, vec!["evt-ful-b2".to_string()]);
    assert_eq!(db.fetch_order(order_id).await.unwrap().unwrap().payment_status, PaymentStatus::Paid);
}
