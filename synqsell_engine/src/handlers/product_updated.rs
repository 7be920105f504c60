use futures_util::future::join_all;
use log::*;
use store_gateway::{InventoryQuantity, ProductStatus, StoreApi, VariantPrice};
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{ImportedProduct, Product, Session, VariantUpdate},
    errors::ReconciliationError,
    events::ProductSnapshot,
    handlers::{collect_results, HandlerContext, HandlerOutcome},
    pricing::price_variant,
    traits::SynqsellDatabase,
};

/// `products/update` from either store.
///
/// The supplier's catalog is authoritative. Supplier edits are recorded and pushed to every retailer mirror; retailer
/// edits to a mirror's price or status are reverted. Pushing identical values back produces a `products/update` on
/// the retailer that this handler then recognises as a no-op, which is what stops the echo.
pub async fn handle<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    shop: &str,
    snapshot: &ProductSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let session = ctx.session_for_shop(shop).await?;
    if let Some(product) = ctx.db.fetch_product_by_shopify_id(session.id, &snapshot.id).await? {
        return update_supplier_product(ctx, &product, snapshot).await;
    }
    if let Some(mirror) = ctx.db.fetch_imported_product_by_shopify_id(session.id, &snapshot.id).await? {
        return revert_retailer_edits(ctx, &session, &mirror, snapshot).await;
    }
    Err(ReconciliationError::not_found(format!("SynqSell product {}", snapshot.id)))
}

async fn update_supplier_product<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    product: &Product,
    snapshot: &ProductSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let status = snapshot.product_status()?;
    let variants = ctx.db.fetch_variants(product.id).await?;
    let mut updates = Vec::with_capacity(variants.len());
    for variant in &variants {
        let Some(incoming) = snapshot.variants.iter().find(|v| v.id == variant.shopify_variant_id) else {
            continue;
        };
        let pricing = price_variant(incoming.price()?, product.retailer_margin_bps, ctx.config.platform_fee_bps);
        updates.push(VariantUpdate {
            variant_id: variant.id,
            retail_price: pricing.retail_price,
            retailer_payment: pricing.retailer_payment,
            supplier_profit: pricing.supplier_profit,
            inventory_quantity: incoming.inventory_quantity,
        });
    }
    ctx.db.update_product(product.id, &snapshot.title, status).await?;
    ctx.db.update_variants(&updates).await?;
    debug!("🔄️ Product #{} updated with {} variants", product.id, updates.len());
    let mirrors = ctx.db.fetch_imported_products_for_product(product.id).await?;
    let pushes = mirrors.iter().map(|m| push_to_mirror(ctx, m, &updates, status));
    let pushed = collect_results(join_all(pushes).await)?;
    let count = pushed.into_iter().filter(|p| *p).count();
    info!("🔄️ Product #{} pushed to {count} retailer mirrors", product.id);
    Ok(HandlerOutcome::applied(format!("product #{} synchronised to {count} mirrors", product.id)))
}

/// Writes the supplier's values to one retailer mirror. Returns false if the retailer is no longer installed.
async fn push_to_mirror<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    mirror: &ImportedProduct,
    updates: &[VariantUpdate],
    status: ProductStatus,
) -> Result<bool, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let retailer = ctx.session(mirror.retailer_id).await?;
    if !retailer.is_active() {
        return Ok(false);
    }
    let creds = retailer.credentials();
    let mirrored = ctx.db.fetch_imported_variants(mirror.id).await?;
    let mut prices = Vec::new();
    let mut quantities = Vec::new();
    for iv in &mirrored {
        let Some(update) = updates.iter().find(|u| u.variant_id == iv.variant_id) else {
            continue;
        };
        prices.push(VariantPrice { variant_id: iv.shopify_variant_id.clone(), price: update.retail_price });
        if let Some(item) = &iv.shopify_inventory_item_id {
            quantities.push(InventoryQuantity { inventory_item_id: item.clone(), quantity: update.inventory_quantity });
        }
    }
    let product_id = mirror.shopify_product_id.as_str();
    if !prices.is_empty() {
        ctx.remote("update mirror prices", || ctx.store.update_variant_prices(&creds, product_id, &prices)).await?;
    }
    match &retailer.fulfillment_location_id {
        Some(location) if !quantities.is_empty() => {
            ctx.remote("set mirror inventory", || ctx.store.set_inventory_quantities(&creds, location, &quantities))
                .await?;
        },
        _ => {},
    }
    ctx.remote("set mirror status", || ctx.store.set_product_status(&creds, product_id, status)).await?;
    trace!("🔄️ Mirror {product_id} on {} updated", retailer.shop);
    Ok(true)
}

async fn revert_retailer_edits<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    retailer: &Session,
    mirror: &ImportedProduct,
    snapshot: &ProductSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let product = ctx
        .db
        .fetch_product(mirror.product_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("product #{}", mirror.product_id)))?;
    let supplier = ctx.session(product.supplier_id).await?;
    let authoritative_status = if supplier.is_active() { product.status } else { ProductStatus::Archived };
    let variants = ctx.db.fetch_variants(product.id).await?;
    let mirrored = ctx.db.fetch_imported_variants(mirror.id).await?;
    let mut prices = Vec::new();
    for iv in &mirrored {
        let Some(incoming) = snapshot.variants.iter().find(|v| v.id == iv.shopify_variant_id) else {
            continue;
        };
        let Some(variant) = variants.iter().find(|v| v.id == iv.variant_id) else {
            continue;
        };
        if incoming.price()? != variant.retail_price {
            prices.push(VariantPrice { variant_id: iv.shopify_variant_id.clone(), price: variant.retail_price });
        }
    }
    let status_changed = snapshot.product_status()? != authoritative_status;
    if prices.is_empty() && !status_changed {
        return Ok(HandlerOutcome::skipped(format!("mirror {} matches the supplier catalog", mirror.shopify_product_id)));
    }
    let creds = retailer.credentials();
    let product_id = mirror.shopify_product_id.as_str();
    if !prices.is_empty() {
        ctx.remote("revert mirror prices", || ctx.store.update_variant_prices(&creds, product_id, &prices)).await?;
    }
    if status_changed {
        ctx.remote("revert mirror status", || ctx.store.set_product_status(&creds, product_id, authoritative_status))
            .await?;
    }
    warn!(
        "🔄️ Reverted edits by {} to mirror {product_id} ({} prices, status changed: {status_changed})",
        retailer.shop,
        prices.len()
    );
    Ok(HandlerOutcome::applied(format!("reverted retailer edits on {product_id}")))
}
