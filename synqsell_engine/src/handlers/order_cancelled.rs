use std::collections::HashMap;

use log::*;
use store_gateway::{NewRefund, NewRefundLine, StoreApi};
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{OrderLineItem, PaymentStatus},
    errors::ReconciliationError,
    events::CancelledOrderSnapshot,
    handlers::{HandlerContext, HandlerOutcome},
    lifecycle::OrderLifecycle,
    traits::SynqsellDatabase,
};

/// A line item whose cumulative cancelled quantity has grown since the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewlyCancelled {
    pub line: OrderLineItem,
    /// The cumulative cancelled quantity, capped at the ordered quantity
    pub cancelled_quantity: i64,
}

impl NewlyCancelled {
    pub fn delta(&self) -> i64 {
        self.cancelled_quantity - self.line.cancelled_quantity
    }
}

/// Compares the snapshot's cumulative cancellations with what has been recorded. `None` cancels everything.
pub fn newly_cancelled(lines: &[OrderLineItem], cancelled: Option<&HashMap<String, i64>>) -> Vec<NewlyCancelled> {
    lines
        .iter()
        .filter_map(|line| {
            let cumulative = match cancelled {
                None => line.quantity,
                Some(quantities) => quantities.get(&line.shopify_supplier_line_item_id).copied().unwrap_or(0),
            }
            .clamp(0, line.quantity);
            (cumulative > line.cancelled_quantity)
                .then(|| NewlyCancelled { line: line.clone(), cancelled_quantity: cumulative })
        })
        .collect()
}

/// `orders/cancelled` on a supplier store.
///
/// Units the supplier cancelled are refunded to the retailer's customer, scoped to the mirrored line items. The order
/// is only cancelled once every line item is fully cancelled; a partial cancellation leaves it open. Money that has
/// already moved (a payment exists) is out of scope, so such orders are refunded but never marked cancelled.
pub async fn handle<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    shop: &str,
    snapshot: &CancelledOrderSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let supplier = ctx.session_for_shop(shop).await?;
    let order = ctx
        .db
        .fetch_order_by_supplier_order_id(supplier.id, &snapshot.id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("SynqSell order {}", snapshot.id)))?;
    if order.payment_status == PaymentStatus::Cancelled {
        return Ok(HandlerOutcome::skipped(format!("order #{} is already cancelled", order.id)));
    }
    let lines = ctx.db.fetch_order_line_items(order.id).await?;
    let quantities = snapshot.cancelled_quantities();
    let targets = newly_cancelled(&lines, quantities.as_ref());
    if !targets.is_empty() {
        let retailer = ctx.session(order.retailer_id).await?;
        let creds = retailer.credentials();
        let refund = NewRefund {
            order_id: order.shopify_retailer_order_id.clone(),
            line_items: targets
                .iter()
                .map(|t| NewRefundLine { line_item_id: t.line.shopify_retailer_line_item_id.clone(), quantity: t.delta() })
                .collect(),
            note: Some(format!("Cancelled by supplier {}", supplier.shop)),
            notify: true,
        };
        let refund_id = ctx.remote("refund retailer order", || ctx.store.create_refund(&creds, &refund)).await?;
        let recorded = targets.iter().map(|t| (t.line.id, t.cancelled_quantity)).collect::<Vec<_>>();
        ctx.db.record_cancelled_quantities(order.id, &recorded).await?;
        info!("🔄️ Refund {refund_id} issued on {} for {} line items of order #{}", retailer.shop, targets.len(), order.id);
    }
    let lines = ctx.db.fetch_order_line_items(order.id).await?;
    let fulfillments = ctx.db.fetch_fulfillments_for_order(order.id).await?;
    let payments = ctx.db.fetch_payments_for_order(order.id).await?;
    let lifecycle = OrderLifecycle::derive(&order, &fulfillments, &payments);
    let fully_cancelled = lines.iter().all(OrderLineItem::is_fully_cancelled);
    if fully_cancelled && lifecycle.can_cancel() {
        ctx.db.update_order_payment_status(order.id, PaymentStatus::Cancelled).await?;
        info!("🔄️ Order #{} is cancelled", order.id);
        return Ok(HandlerOutcome::applied(format!("order #{} cancelled", order.id)));
    }
    if fully_cancelled {
        warn!("🔄️ Order #{} was cancelled by the supplier after it reached {lifecycle}. It stays {lifecycle}.", order.id);
    }
    if targets.is_empty() {
        Ok(HandlerOutcome::skipped(format!("no new cancellations on order #{}", order.id)))
    } else {
        Ok(HandlerOutcome::applied(format!("{} line items of order #{} cancelled", targets.len(), order.id)))
    }
}
