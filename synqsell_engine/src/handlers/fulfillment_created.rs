use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{NewFulfillment, OrderLineItem, PaymentStatus},
    errors::ReconciliationError,
    events::FulfillmentSnapshot,
    handlers::{payouts, retailer_fulfillments, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `fulfillments/create` on a supplier store: mirror the shipment onto the retailer's fulfillment order and link the
/// two fulfillments.
pub async fn handle<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    shop: &str,
    snapshot: &FulfillmentSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    if snapshot.is_cancelled() {
        return Ok(HandlerOutcome::skipped(format!("fulfillment {} was created cancelled", snapshot.id)));
    }
    if let Some(existing) = ctx.db.fetch_fulfillment_by_supplier_id(&snapshot.id).await? {
        if snapshot.is_delivered() {
            let order = ctx
                .db
                .fetch_order(existing.order_id)
                .await?
                .ok_or_else(|| ReconciliationError::not_found(format!("order #{}", existing.order_id)))?;
            return payouts::initiate_payment(ctx, &order, &existing).await;
        }
        return Ok(HandlerOutcome::skipped(format!("fulfillment {} is already linked", snapshot.id)));
    }
    let supplier = ctx.session_for_shop(shop).await?;
    let order = ctx
        .db
        .fetch_order_by_supplier_order_id(supplier.id, &snapshot.order_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("SynqSell order {}", snapshot.order_id)))?;
    if order.payment_status == PaymentStatus::Cancelled {
        return Ok(HandlerOutcome::skipped(format!("order #{} is cancelled", order.id)));
    }
    let order_lines = ctx.db.fetch_order_line_items(order.id).await?;
    let lines = map_lines(snapshot, &order_lines);
    if lines.is_empty() {
        return Ok(HandlerOutcome::skipped(format!("fulfillment {} has no active SynqSell line items", snapshot.id)));
    }
    let retailer = ctx.session(order.retailer_id).await?;
    let tracking = snapshot.tracking();
    let retailer_fulfillment_id = retailer_fulfillments::create_or_adopt(
        ctx,
        &retailer.credentials(),
        &order.shopify_retailer_fulfillment_order_id,
        &lines,
        &tracking,
    )
    .await?;
    let new_fulfillment = NewFulfillment {
        order_id: order.id,
        supplier_shopify_fulfillment_id: snapshot.id.clone(),
        retailer_shopify_fulfillment_id: retailer_fulfillment_id.clone(),
        shipment_status: snapshot.shipment_status.clone(),
        tracking,
        line_items: lines.iter().map(|(line, qty)| (line.id, *qty)).collect(),
    };
    let result = ctx.db.insert_fulfillment(new_fulfillment).await?;
    if !result.is_inserted() {
        return Err(ReconciliationError::InvariantViolation(format!(
            "fulfillment {} was linked by a concurrent delivery",
            snapshot.id
        )));
    }
    info!(
        "🔄️ Supplier fulfillment {} linked to retailer fulfillment {retailer_fulfillment_id} for order #{}",
        snapshot.id, order.id
    );
    if snapshot.is_delivered() {
        let fulfillment = ctx
            .db
            .fetch_fulfillment(result.id())
            .await?
            .ok_or_else(|| ReconciliationError::not_found(format!("fulfillment #{}", result.id())))?;
        return payouts::initiate_payment(ctx, &order, &fulfillment).await;
    }
    Ok(HandlerOutcome::applied(format!("linked fulfillment {} as #{}", snapshot.id, result.id())))
}

/// Maps the fulfilled supplier line items onto the order's line items, capped at each line's active quantity.
fn map_lines(snapshot: &FulfillmentSnapshot, order_lines: &[OrderLineItem]) -> Vec<(OrderLineItem, i64)> {
    snapshot
        .line_items
        .iter()
        .filter_map(|fulfilled| {
            let line = order_lines.iter().find(|l| l.shopify_supplier_line_item_id == fulfilled.id)?;
            let qty = fulfilled.quantity.min(line.active_quantity());
            (qty > 0).then(|| (line.clone(), qty))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use synq_common::Cents;

    use super::*;
    use crate::events::FulfillmentLineSnapshot;

    fn line(id: i64, supplier_line: &str, quantity: i64, cancelled_quantity: i64) -> OrderLineItem {
        OrderLineItem {
            id,
            order_id: 1,
            variant_id: None,
            shopify_supplier_line_item_id: supplier_line.into(),
            shopify_retailer_line_item_id: String::new(),
            shopify_retailer_fulfillment_order_line_item_id: String::new(),
            quantity,
            cancelled_quantity,
            retailer_payment: Cents::from(100),
            supplier_profit: Cents::from(90),
        }
    }

    #[test]
    fn lines_are_capped_at_active_quantity() {
        let snapshot = FulfillmentSnapshot {
            id: "F".into(),
            order_id: "O".into(),
            status: Some("success".into()),
            shipment_status: None,
            tracking_company: None,
            tracking_number: None,
            tracking_url: None,
            line_items: vec![
                FulfillmentLineSnapshot { id: "A".into(), quantity: 3 },
                FulfillmentLineSnapshot { id: "B".into(), quantity: 1 },
                FulfillmentLineSnapshot { id: "X".into(), quantity: 1 },
            ],
        };
        let order_lines = [line(1, "A", 3, 1), line(2, "B", 1, 1)];
        let mapped = map_lines(&snapshot, &order_lines);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].0.id, 1);
        assert_eq!(mapped[0].1, 2);
    }
}
