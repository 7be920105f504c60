//! Creating the retailer-side half of a linked fulfillment.
use std::collections::HashMap;

use log::*;
use store_gateway::{NewFulfillmentLine, NewStoreFulfillment, StoreApi, StoreCredentials, TrackingInfo};
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::OrderLineItem,
    errors::ReconciliationError,
    handlers::HandlerContext,
    traits::SynqsellDatabase,
};

/// Creates a fulfillment for `lines` on the retailer's fulfillment order and returns its id.
///
/// If the fulfillment order no longer has enough unfulfilled quantity, an earlier attempt created the fulfillment
/// and failed before it was recorded. When exactly one fulfillment on the fulfillment order is unknown to the
/// database, that one is adopted instead of failing.
pub async fn create_or_adopt<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    retailer: &StoreCredentials,
    fulfillment_order_id: &str,
    lines: &[(OrderLineItem, i64)],
    tracking: &TrackingInfo,
) -> Result<String, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let fo = ctx
        .remote("fetch fulfillment order", || ctx.store.fetch_fulfillment_order(retailer, fulfillment_order_id))
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("fulfillment order {fulfillment_order_id}")))?;
    let remaining = fo.line_items.iter().map(|l| (l.id.as_str(), l.remaining_quantity)).collect::<HashMap<_, _>>();
    let short = lines.iter().any(|(line, qty)| {
        remaining.get(line.shopify_retailer_fulfillment_order_line_item_id.as_str()).copied().unwrap_or(0) < *qty
    });
    if short {
        let mut unknown = Vec::new();
        for id in &fo.fulfillment_ids {
            if ctx.db.fetch_fulfillment_by_retailer_id(id).await?.is_none() {
                unknown.push(id.clone());
            }
        }
        return match unknown.as_slice() {
            [id] => {
                info!("🔄️ Adopting unrecorded fulfillment {id} on {fulfillment_order_id}");
                Ok(id.clone())
            },
            _ => Err(ReconciliationError::RemoteUser(format!(
                "Fulfillment order {fulfillment_order_id} cannot accommodate the fulfillment and {} unrecorded \
                 fulfillments exist on it",
                unknown.len()
            ))),
        };
    }
    let fulfillment = NewStoreFulfillment {
        fulfillment_order_id: fo.id.clone(),
        line_items: lines
            .iter()
            .map(|(line, qty)| NewFulfillmentLine {
                fulfillment_order_line_item_id: line.shopify_retailer_fulfillment_order_line_item_id.clone(),
                quantity: *qty,
            })
            .collect(),
        tracking: tracking.clone(),
        notify_customer: true,
    };
    let id = ctx.remote("create retailer fulfillment", || ctx.store.create_fulfillment(retailer, &fulfillment)).await?;
    debug!("🔄️ Created fulfillment {id} on {} for {fulfillment_order_id}", retailer.shop);
    Ok(id)
}
