use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::Role,
    errors::ReconciliationError,
    events::FulfillmentOrderRouted,
    handlers::{HandlerContext, HandlerOutcome},
    splitter::split_fulfillment_order,
    traits::SynqsellDatabase,
};

/// `fulfillment_orders/order_routing_complete`, raised by the retailer store once it has assigned a fulfillment
/// order to a location.
pub async fn handle<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    shop: &str,
    payload: &FulfillmentOrderRouted,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let retailer = ctx.session_for_shop(shop).await?;
    if !ctx.has_role(&retailer, Role::Retailer).await? {
        return Ok(HandlerOutcome::skipped(format!("{shop} is not a retailer")));
    }
    let fo_id = payload.fulfillment_order.id.as_str();
    let result = split_fulfillment_order(ctx, &retailer, fo_id).await?;
    if result.is_empty() {
        return Ok(HandlerOutcome::skipped(format!("fulfillment order {fo_id} has no SynqSell items")));
    }
    info!(
        "🔄️ Fulfillment order {fo_id} split. {} orders created, {} already existed, {} line items excluded",
        result.created.len(),
        result.existing.len(),
        result.excluded_line_items.len()
    );
    if result.created.is_empty() {
        Ok(HandlerOutcome::skipped(format!("orders for fulfillment order {fo_id} already exist")))
    } else {
        Ok(HandlerOutcome::applied(format!("created orders {:?} for fulfillment order {fo_id}", result.created)))
    }
}
