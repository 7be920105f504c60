use serde_json::{json, Value};
use store_gateway::StoreOrder;
use synqsell_engine::{
    db_types::{FulfillmentStatus, Order, PaymentStatus},
    events::Topic,
    test_utils::{
        fakes::{FakePayments, FakeStore},
        prepare_env::fresh_database,
        seed::*,
    },
    EngineConfig,
    EventCoordinator,
    FulfillmentManagement,
    OrderManagement,
    RetryPolicy,
    SqliteDatabase,
};

type Coordinator = EventCoordinator<SqliteDatabase, FakeStore, FakePayments>;

struct Routed {
    coordinator: Coordinator,
    store: FakeStore,
    order: Order,
    supplier_order: StoreOrder,
}

async fn routed_order() -> Routed {
    let db = fresh_database().await;
    let store = FakeStore::new();
    let payments = FakePayments::new();
    let config = EngineConfig::default().with_retry(RetryPolicy::immediate(1));
    let coordinator = EventCoordinator::new(db, store.clone(), payments, config);
    let scenario = standard_scenario(coordinator.db(), &store).await;
    let route = envelope(
        "evt-route",
        Topic::OrderRoutingComplete,
        RETAILER_SHOP,
        routing_complete(&scenario.fulfillment_order_id),
    );
    let report = coordinator.process_batch(vec![route]).await;
    assert_eq!(report.processed.len(), 1);
    let order =
        coordinator.db().fetch_orders_for_fulfillment_order(&scenario.fulfillment_order_id).await.unwrap().remove(0);
    let supplier_order = store.state().orders_for(SUPPLIER_SHOP)[0].order.clone();
    Routed { coordinator, store, order, supplier_order }
}

/// The supplier line item for `variant`, i.e. the qty-3 mug (`11`) or the qty-1 jug (`12`).
fn supplier_line(order: &StoreOrder, variant: u64) -> String {
    let variant = format!("gid://shopify/ProductVariant/{variant}");
    order.line_for_variant(&variant).map(|l| l.id.clone()).unwrap()
}

fn cancelled(order: &StoreOrder, refunds: &[&[(String, i64)]]) -> Value {
    let line_items = order.line_items.iter().map(|l| json!({ "id": l.id, "quantity": l.quantity })).collect::<Vec<_>>();
    let refunds = refunds
        .iter()
        .map(|lines| {
            let items = lines.iter().map(|(id, qty)| json!({ "line_item_id": id, "quantity": qty })).collect::<Vec<_>>();
            json!({ "refund_line_items": items })
        })
        .collect::<Vec<_>>();
    json!({
        "id": order.id,
        "cancelled_at": "2024-10-18T10:00:00Z",
        "cancel_reason": "inventory",
        "line_items": line_items,
        "refunds": refunds
    })
}

fn cancel_event(event_id: &str, payload: Value) -> Value {
    envelope(event_id, Topic::OrderCancelled, SUPPLIER_SHOP, payload)
}

#[tokio::test]
async fn partial_cancellation_refunds_only_the_cancelled_line() {
    let Routed { coordinator, store, order, supplier_order } = routed_order().await;
    let db = coordinator.db();
    let mug = supplier_line(&supplier_order, 11);
    let jug = supplier_line(&supplier_order, 12);

    let partial = cancelled(&supplier_order, &[&[(mug.clone(), 3)]]);
    let report = coordinator.process_batch(vec![cancel_event("evt-cancel-1", partial.clone())]).await;
    assert_eq!(report.processed, vec!["evt-cancel-1".to_string()]);

    let refunds = store.state().refunds_for(RETAILER_SHOP);
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].order_id, "gid://shopify/Order/9001");
    assert_eq!(refunds[0].line_items.len(), 1);
    assert_eq!(refunds[0].line_items[0].line_item_id, "gid://shopify/LineItem/7001");
    assert_eq!(refunds[0].line_items[0].quantity, 3);

    let order_now = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order_now.payment_status, PaymentStatus::Incomplete, "the jug is still owed");
    let lines = db.fetch_order_line_items(order.id).await.unwrap();
    let mug_line = lines.iter().find(|l| l.shopify_supplier_line_item_id == mug).unwrap();
    assert_eq!(mug_line.cancelled_quantity, 3);
    assert_eq!(mug_line.active_quantity(), 0);

    // A duplicate with a new id refunds nothing more
    let report = coordinator.process_batch(vec![cancel_event("evt-cancel-1b", partial)]).await;
    assert_eq!(report.skipped, vec!["evt-cancel-1b".to_string()]);
    assert_eq!(store.state().refunds_for(RETAILER_SHOP).len(), 1);

    // The remaining item is cancelled later; only the delta is refunded
    let full = cancelled(&supplier_order, &[&[(mug, 3)], &[(jug, 1)]]);
    let report = coordinator.process_batch(vec![cancel_event("evt-cancel-2", full)]).await;
    assert_eq!(report.processed.len(), 1);
    let refunds = store.state().refunds_for(RETAILER_SHOP);
    assert_eq!(refunds.len(), 2);
    assert_eq!(refunds[1].line_items.len(), 1);
    assert_eq!(refunds[1].line_items[0].line_item_id, "gid://shopify/LineItem/7002");
    let order_now = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order_now.payment_status, PaymentStatus::Cancelled);
}

#[tokio::test]
async fn whole_order_cancellation() {
    let Routed { coordinator, store, order, supplier_order } = routed_order().await;
    let report = coordinator.process_batch(vec![cancel_event("evt-cancel", cancelled(&supplier_order, &[]))]).await;
    assert_eq!(report.processed.len(), 1);

    let refunds = store.state().refunds_for(RETAILER_SHOP);
    assert_eq!(refunds.len(), 1);
    let mut quantities =
        refunds[0].line_items.iter().map(|l| (l.line_item_id.clone(), l.quantity)).collect::<Vec<_>>();
    quantities.sort();
    assert_eq!(quantities, vec![
        ("gid://shopify/LineItem/7001".to_string(), 3),
        ("gid://shopify/LineItem/7002".to_string(), 1)
    ]);
    let db = coordinator.db();
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().payment_status, PaymentStatus::Cancelled);

    // Fulfillments arriving for a cancelled order are not mirrored
    let shipped = fulfillment_snapshot(8001, &supplier_order, "success", None);
    let report = coordinator
        .process_batch(vec![envelope("evt-ful", Topic::FulfillmentCreated, SUPPLIER_SHOP, shipped)])
        .await;
    assert_eq!(report.skipped.len(), 1);
    assert!(store.state().fulfillments_for(RETAILER_SHOP).is_empty());

    let report = coordinator.process_batch(vec![cancel_event("evt-cancel-again", cancelled(&supplier_order, &[]))]).await;
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(store.state().refunds_for(RETAILER_SHOP).len(), 1);
}

#[tokio::test]
async fn cancellation_after_payment_keeps_the_order_paid() {
    let Routed { coordinator, store, order, supplier_order } = routed_order().await;
    let delivered = fulfillment_snapshot(8001, &supplier_order, "success", Some("delivered"));
    coordinator.process_batch(vec![envelope("evt-ful", Topic::FulfillmentCreated, SUPPLIER_SHOP, delivered)]).await;
    let db = coordinator.db();
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().payment_status, PaymentStatus::Paid);

    let report = coordinator.process_batch(vec![cancel_event("evt-cancel", cancelled(&supplier_order, &[]))]).await;
    assert_eq!(report.processed.len(), 1);
    assert_eq!(store.state().refunds_for(RETAILER_SHOP).len(), 1);
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn supplier_cancelled_fulfillment_is_cancelled_on_the_retailer() {
    let Routed { coordinator, store, supplier_order, .. } = routed_order().await;
    let shipped = fulfillment_snapshot(8001, &supplier_order, "success", None);
    coordinator.process_batch(vec![envelope("evt-ful", Topic::FulfillmentCreated, SUPPLIER_SHOP, shipped)]).await;
    let retailer_fulfillment = store.state().fulfillments_for(RETAILER_SHOP)[0].id.clone();

    let cancelled = fulfillment_snapshot(8001, &supplier_order, "cancelled", None);
    let report = coordinator
        .process_batch(vec![envelope("evt-ful-cancel", Topic::FulfillmentUpdated, SUPPLIER_SHOP, cancelled.clone())])
        .await;
    assert_eq!(report.processed.len(), 1);
    assert_eq!(store.state().cancelled_fulfillments, vec![(RETAILER_SHOP.to_string(), retailer_fulfillment)]);
    let fulfillment =
        coordinator.db().fetch_fulfillment_by_supplier_id("gid://shopify/Fulfillment/8001").await.unwrap().unwrap();
    assert_eq!(fulfillment.status, FulfillmentStatus::Cancelled);

    // A re-delivery repeats the remote cancel, which the store treats as a no-op
    let report = coordinator
        .process_batch(vec![envelope("evt-ful-cancel-dup", Topic::FulfillmentUpdated, SUPPLIER_SHOP, cancelled)])
        .await;
    assert!(report.failed.is_empty());
    assert_eq!(store.state().fulfillments_for(RETAILER_SHOP).len(), 1);
    let fulfillment =
        coordinator.db().fetch_fulfillment_by_supplier_id("gid://shopify/Fulfillment/8001").await.unwrap().unwrap();
    assert_eq!(fulfillment.status, FulfillmentStatus::Cancelled);
}

#[tokio::test]
async fn retailer_cancelled_fulfillment_is_recreated() {
    let Routed { coordinator, store, supplier_order, .. } = routed_order().await;
    let shipped = fulfillment_snapshot(8001, &supplier_order, "success", None);
    coordinator.process_batch(vec![envelope("evt-ful", Topic::FulfillmentCreated, SUPPLIER_SHOP, shipped)]).await;
    let original = store.state().fulfillments_for(RETAILER_SHOP)[0].id.clone();
    let numeric = original.rsplit('/').next().unwrap().to_string();

    // The retailer cancels the mirrored fulfillment in their admin
    {
        let mut state = store.state();
        let fo = state.fulfillment_orders.get_mut("gid://shopify/FulfillmentOrder/501").unwrap();
        fo.line_items[0].remaining_quantity = 3;
        fo.line_items[1].remaining_quantity = 1;
    }
    let payload = json!({ "id": numeric, "order_id": 9001, "status": "cancelled", "line_items": [] });
    let report = coordinator
        .process_batch(vec![envelope("evt-retailer-cancel", Topic::FulfillmentUpdated, RETAILER_SHOP, payload)])
        .await;
    assert_eq!(report.processed.len(), 1);
    let created = store.state().fulfillments_for(RETAILER_SHOP);
    assert_eq!(created.len(), 2);
    let fulfillment =
        coordinator.db().fetch_fulfillment_by_supplier_id("gid://shopify/Fulfillment/8001").await.unwrap().unwrap();
    assert_eq!(fulfillment.retailer_shopify_fulfillment_id, created[1].id);
    assert_eq!(created[1].request.tracking.company.as_deref(), Some("UPS"));
}
