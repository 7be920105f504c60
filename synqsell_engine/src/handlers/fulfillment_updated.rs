use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{Fulfillment, FulfillmentStatus, Order, OrderLineItem},
    errors::ReconciliationError,
    events::FulfillmentSnapshot,
    handlers::{payouts, retailer_fulfillments, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `fulfillments/update` from either store.
///
/// * Retailer-origin cancellation: the retailer cancelled the mirrored fulfillment, but the supplier has shipped, so
///   the mirror is recreated and relinked.
/// * Supplier-origin cancellation: the retailer mirror is cancelled too.
/// * Supplier-origin delivery: the supplier is paid.
/// * Any other supplier-origin change: tracking details are copied to the mirror.
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
    let session = ctx.session_for_shop(shop).await?;
    if let Some(fulfillment) = ctx.db.fetch_fulfillment_by_retailer_id(&snapshot.id).await? {
        let order = fetch_order(ctx, &fulfillment).await?;
        if order.retailer_id != session.id {
            return Err(ReconciliationError::not_found(format!("fulfillment {} on {shop}", snapshot.id)));
        }
        if !snapshot.is_cancelled() {
            return Ok(HandlerOutcome::skipped(format!("retailer fulfillment {} changed", snapshot.id)));
        }
        return recreate_retailer_fulfillment(ctx, &order, &fulfillment).await;
    }
    let fulfillment = ctx
        .db
        .fetch_fulfillment_by_supplier_id(&snapshot.id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("linked fulfillment for {}", snapshot.id)))?;
    let order = fetch_order(ctx, &fulfillment).await?;
    if order.supplier_id != session.id {
        return Err(ReconciliationError::not_found(format!("fulfillment {} on {shop}", snapshot.id)));
    }
    if snapshot.is_cancelled() {
        return cancel_retailer_fulfillment(ctx, &order, &fulfillment).await;
    }
    if !fulfillment.is_open() {
        return Ok(HandlerOutcome::skipped(format!("fulfillment #{} is cancelled", fulfillment.id)));
    }
    let synced = sync_tracking(ctx, &order, &fulfillment, snapshot).await?;
    if snapshot.is_delivered() {
        return payouts::initiate_payment(ctx, &order, &fulfillment).await;
    }
    if synced {
        Ok(HandlerOutcome::applied(format!("tracking of fulfillment #{} updated", fulfillment.id)))
    } else {
        Ok(HandlerOutcome::skipped(format!("fulfillment #{} is unchanged", fulfillment.id)))
    }
}

async fn fetch_order<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    fulfillment: &Fulfillment,
) -> Result<Order, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    ctx.db
        .fetch_order(fulfillment.order_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("order #{}", fulfillment.order_id)))
}

/// The row is marked cancelled before the remote call, so that a failed remote cancel is simply repeated on
/// re-delivery.
async fn cancel_retailer_fulfillment<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    order: &Order,
    fulfillment: &Fulfillment,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    if fulfillment.is_open() {
        ctx.db.update_fulfillment_status(fulfillment.id, FulfillmentStatus::Cancelled).await?;
    }
    let retailer = ctx.session(order.retailer_id).await?;
    let creds = retailer.credentials();
    let retailer_id = fulfillment.retailer_shopify_fulfillment_id.as_str();
    ctx.remote("cancel retailer fulfillment", || ctx.store.cancel_fulfillment(&creds, retailer_id)).await?;
    info!("🔄️ Fulfillment #{} cancelled on both stores", fulfillment.id);
    Ok(HandlerOutcome::applied(format!("fulfillment #{} cancelled", fulfillment.id)))
}

async fn recreate_retailer_fulfillment<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    order: &Order,
    fulfillment: &Fulfillment,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    if !fulfillment.is_open() {
        return Ok(HandlerOutcome::skipped(format!("fulfillment #{} was cancelled by the supplier", fulfillment.id)));
    }
    let fulfilled = ctx.db.fetch_fulfillment_line_items(fulfillment.id).await?;
    let order_lines = ctx.db.fetch_order_line_items(order.id).await?;
    let lines = fulfilled
        .iter()
        .filter_map(|f| order_lines.iter().find(|l| l.id == f.order_line_item_id).map(|l| (l.clone(), f.quantity)))
        .collect::<Vec<(OrderLineItem, i64)>>();
    let retailer = ctx.session(order.retailer_id).await?;
    let new_id = retailer_fulfillments::create_or_adopt(
        ctx,
        &retailer.credentials(),
        &order.shopify_retailer_fulfillment_order_id,
        &lines,
        &fulfillment.tracking(),
    )
    .await?;
    ctx.db.relink_retailer_fulfillment(fulfillment.id, &new_id).await?;
    warn!(
        "🔄️ {} cancelled fulfillment {}, which the supplier has shipped. Recreated it as {new_id}.",
        retailer.shop, fulfillment.retailer_shopify_fulfillment_id
    );
    Ok(HandlerOutcome::applied(format!("retailer fulfillment of #{} recreated as {new_id}", fulfillment.id)))
}

/// Copies changed tracking details to the retailer mirror and records them. Returns whether anything changed.
async fn sync_tracking<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    order: &Order,
    fulfillment: &Fulfillment,
    snapshot: &FulfillmentSnapshot,
) -> Result<bool, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let tracking = snapshot.tracking();
    let tracking_changed = !tracking.is_empty() && tracking != fulfillment.tracking();
    let status_changed = snapshot.shipment_status.is_some() && snapshot.shipment_status != fulfillment.shipment_status;
    if !tracking_changed && !status_changed {
        return Ok(false);
    }
    if tracking_changed {
        let retailer = ctx.session(order.retailer_id).await?;
        let creds = retailer.credentials();
        let retailer_id = fulfillment.retailer_shopify_fulfillment_id.as_str();
        ctx.remote("update retailer tracking", || ctx.store.update_tracking(&creds, retailer_id, &tracking)).await?;
    }
    let tracking = if tracking.is_empty() { fulfillment.tracking() } else { tracking };
    ctx.db.update_fulfillment_tracking(fulfillment.id, &tracking, snapshot.shipment_status.as_deref()).await?;
    debug!("🔄️ Fulfillment #{} tracking synchronised", fulfillment.id);
    Ok(true)
}
