//! # Order splitter
//!
//! A retailer's fulfillment order can hold products from several suppliers. The splitter turns it into one
//! supplier-side order per supplier, created on the supplier's store and recorded as an [`Order`] row.
//!
//! Both halves are idempotent:
//! * the supplier store order is tagged `synqsell-fo-<fulfillment order number>` and looked up by that tag before a
//!   new one is created,
//! * the database refuses a second order for the same supplier and fulfillment order.
//!
//! [`Order`]: crate::db_types::Order
use std::collections::BTreeMap;

use futures_util::future::join_all;
use log::*;
use store_gateway::{
    gid,
    FulfillmentOrderDetails,
    FulfillmentOrderLineItem,
    NewOrderLine,
    NewStoreOrder,
    StoreApi,
    StoreOrder,
};
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{NewOrder, NewOrderLineItem, Session, VariantOrigin},
    errors::ReconciliationError,
    handlers::HandlerContext,
    traits::SynqsellDatabase,
    InsertResult,
};

pub const SYNQSELL_TAG: &str = "synqsell";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitResult {
    /// Ids of the orders created by this split
    pub created: Vec<i64>,
    /// Ids of orders that a previous delivery had already created
    pub existing: Vec<i64>,
    /// Fulfillment-order line items that are not SynqSell products
    pub excluded_line_items: Vec<String>,
}

impl SplitResult {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.existing.is_empty()
    }
}

/// The tag that marks the supplier store order created for a retailer fulfillment order.
pub fn order_tag(fulfillment_order_id: &str) -> String {
    match gid::numeric_id(fulfillment_order_id) {
        Some(n) => format!("synqsell-fo-{n}"),
        None => format!("synqsell-fo-{}", fulfillment_order_id.replace(|c: char| !c.is_ascii_alphanumeric(), "-")),
    }
}

enum GroupResult {
    Created(i64),
    Existing(i64),
    SupplierUnavailable,
}

type SupplierLines<'f> = Vec<(&'f FulfillmentOrderLineItem, VariantOrigin)>;

pub async fn split_fulfillment_order<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    retailer: &Session,
    fulfillment_order_id: &str,
) -> Result<SplitResult, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    // Only fulfillment orders assigned to the retailer's SynqSell location are ours to route
    let location = retailer.fulfillment_location_id.as_deref().ok_or_else(|| {
        ReconciliationError::not_found(format!("SynqSell fulfillment location of retailer {}", retailer.shop))
    })?;
    let creds = retailer.credentials();
    let fo = ctx
        .remote("fetch fulfillment order", || ctx.store.fetch_fulfillment_order(&creds, fulfillment_order_id))
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("fulfillment order {fulfillment_order_id}")))?;
    if fo.assigned_location_id.as_deref() != Some(location) {
        return Err(ReconciliationError::not_found(format!(
            "SynqSell assignment for fulfillment order {} (assigned to {:?})",
            fo.id, fo.assigned_location_id
        )));
    }
    let mut result = SplitResult::default();
    let mut groups: BTreeMap<i64, SupplierLines> = BTreeMap::new();
    for line in &fo.line_items {
        let origin = match &line.variant_id {
            Some(variant_id) => ctx.db.resolve_variant_origin(retailer.id, variant_id).await?,
            None => None,
        };
        match origin {
            Some(origin) if line.total_quantity > 0 => groups.entry(origin.supplier_id).or_default().push((line, origin)),
            _ => result.excluded_line_items.push(line.id.clone()),
        }
    }
    if groups.is_empty() {
        debug!("🔄️ Fulfillment order {} has no SynqSell line items", fo.id);
        return Ok(result);
    }
    debug!("🔄️ Splitting fulfillment order {} across {} suppliers", fo.id, groups.len());
    let splits = groups.into_iter().map(|(supplier_id, lines)| split_for_supplier(ctx, retailer, &fo, supplier_id, lines));
    let outcomes = join_all(splits).await;
    let mut first_error = None;
    for outcome in outcomes {
        match outcome {
            Ok((GroupResult::Created(id), _)) => result.created.push(id),
            Ok((GroupResult::Existing(id), _)) => result.existing.push(id),
            Ok((GroupResult::SupplierUnavailable, lines)) => result.excluded_line_items.extend(lines),
            Err(e) => {
                error!("🔄️ Could not split fulfillment order {} for a supplier. {e}", fo.id);
                first_error.get_or_insert(e);
            },
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(result),
    }
}

async fn split_for_supplier<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    retailer: &Session,
    fo: &FulfillmentOrderDetails,
    supplier_id: i64,
    lines: SupplierLines<'_>,
) -> Result<(GroupResult, Vec<String>), ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let line_ids = lines.iter().map(|(l, _)| l.id.clone()).collect::<Vec<_>>();
    if let Some(order) = ctx.db.fetch_order_for_fulfillment_order(supplier_id, &fo.id).await? {
        trace!("🔄️ Order #{} already exists for supplier #{supplier_id}", order.id);
        return Ok((GroupResult::Existing(order.id), line_ids));
    }
    let supplier = ctx.session(supplier_id).await?;
    if !supplier.is_active() {
        warn!("🔄️ Supplier {} has uninstalled SynqSell. Its items on {} are not routed.", supplier.shop, fo.id);
        return Ok((GroupResult::SupplierUnavailable, line_ids));
    }
    let creds = supplier.credentials();
    let tag = order_tag(&fo.id);
    let existing = ctx.remote("find supplier order", || ctx.store.find_order_by_tag(&creds, &tag)).await?;
    let remote_order = match existing {
        Some(order) => {
            info!("🔄️ Re-using order {} on {} for fulfillment order {}", order.id, supplier.shop, fo.id);
            order
        },
        None => {
            let new_order = NewStoreOrder {
                line_items: lines
                    .iter()
                    .map(|(line, origin)| NewOrderLine {
                        variant_id: origin.shopify_variant_id.clone(),
                        quantity: line.total_quantity,
                        unit_price: origin.retailer_payment,
                    })
                    .collect(),
                currency: ctx.config.default_currency.clone(),
                shipping_address: fo.destination.clone(),
                tags: vec![tag.clone(), SYNQSELL_TAG.to_string()],
                note: Some(format!("SynqSell order for {} ({})", retailer.shop, fo.order_id)),
            };
            let order = ctx.remote("create supplier order", || ctx.store.create_order(&creds, &new_order)).await?;
            info!("🔄️ Created order {} on {} for fulfillment order {}", order.id, supplier.shop, fo.id);
            order
        },
    };
    let new_order = NewOrder {
        supplier_id,
        retailer_id: retailer.id,
        shopify_supplier_order_id: remote_order.id.clone(),
        shopify_retailer_order_id: fo.order_id.clone(),
        shopify_retailer_fulfillment_order_id: fo.id.clone(),
        currency: ctx.config.default_currency.clone(),
        line_items: match_remote_lines(&remote_order, &lines)?,
    };
    match ctx.db.insert_order(new_order).await? {
        InsertResult::Inserted(id) => Ok((GroupResult::Created(id), line_ids)),
        InsertResult::AlreadyExists(id) => Ok((GroupResult::Existing(id), line_ids)),
    }
}

/// Pairs every fulfillment-order line with the supplier order line created for the same variant.
fn match_remote_lines(
    remote: &StoreOrder,
    lines: &SupplierLines<'_>,
) -> Result<Vec<NewOrderLineItem>, ReconciliationError> {
    let mut used = vec![false; remote.line_items.len()];
    let mut result = Vec::with_capacity(lines.len());
    for (line, origin) in lines {
        let index = remote
            .line_items
            .iter()
            .enumerate()
            .position(|(i, l)| !used[i] && l.variant_id.as_deref() == Some(origin.shopify_variant_id.as_str()))
            .ok_or_else(|| {
                ReconciliationError::RemoteUser(format!(
                    "Supplier order {} has no line for variant {}",
                    remote.id, origin.shopify_variant_id
                ))
            })?;
        used[index] = true;
        result.push(NewOrderLineItem {
            variant_id: Some(origin.variant_id),
            shopify_supplier_line_item_id: remote.line_items[index].id.clone(),
            shopify_retailer_line_item_id: line.line_item_id.clone(),
            shopify_retailer_fulfillment_order_line_item_id: line.id.clone(),
            quantity: line.total_quantity,
            retailer_payment: origin.retailer_payment,
            supplier_profit: origin.supplier_profit,
        });
    }
    Ok(result)
}
