use futures_util::future::join_all;
use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::ImportedProduct,
    errors::ReconciliationError,
    events::DeletedProductSnapshot,
    handlers::{collect_results, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `products/delete`. A deleted supplier product takes every retailer mirror with it. A deleted retailer mirror only
/// loses its mirror rows.
pub async fn handle<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    shop: &str,
    snapshot: &DeletedProductSnapshot,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let session = ctx.session_for_shop(shop).await?;
    if let Some(product) = ctx.db.fetch_product_by_shopify_id(session.id, &snapshot.id).await? {
        let mirrors = ctx.db.fetch_imported_products_for_product(product.id).await?;
        let count = mirrors.len();
        let deletions = mirrors.iter().map(|m| delete_mirror(ctx, m));
        collect_results(join_all(deletions).await)?;
        ctx.db.delete_product(product.id).await?;
        info!("🔄️ Product #{} and its {count} retailer mirrors deleted", product.id);
        return Ok(HandlerOutcome::applied(format!("product #{} and {count} mirrors deleted", product.id)));
    }
    if let Some(mirror) = ctx.db.fetch_imported_product_by_shopify_id(session.id, &snapshot.id).await? {
        ctx.db.delete_imported_product(mirror.id).await?;
        info!("🔄️ {shop} deleted mirror {}. Mirror #{} removed.", snapshot.id, mirror.id);
        return Ok(HandlerOutcome::applied(format!("mirror #{} removed", mirror.id)));
    }
    Err(ReconciliationError::not_found(format!("SynqSell product {}", snapshot.id)))
}

/// Deletes the mirror from the retailer's store, then its rows. Stores that uninstalled SynqSell are not contacted.
pub(crate) async fn delete_mirror<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    mirror: &ImportedProduct,
) -> Result<(), ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let retailer = ctx.session(mirror.retailer_id).await?;
    if retailer.is_active() {
        let creds = retailer.credentials();
        let product_id = mirror.shopify_product_id.as_str();
        ctx.remote("delete mirror", || ctx.store.delete_product(&creds, product_id)).await?;
    }
    ctx.db.delete_imported_product(mirror.id).await?;
    trace!("🔄️ Mirror {} on {} deleted", mirror.shopify_product_id, retailer.shop);
    Ok(())
}
