use futures_util::future::join_all;
use log::*;
use store_gateway::{ProductStatus, StoreApi};
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::{ImportedProduct, Role},
    errors::ReconciliationError,
    handlers::{collect_results, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `app/uninstalled`. A supplier's products can no longer be ordered, so every retailer mirror is archived. The session
/// is flagged, not deleted; its rows are removed by `shop/redact`.
pub async fn handle<B, S, P>(ctx: HandlerContext<'_, B, S, P>, shop: &str) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let session = ctx.session_for_shop(shop).await?;
    let mut archived = 0;
    if ctx.has_role(&session, Role::Supplier).await? {
        let mirrors = ctx.db.fetch_imported_products_for_supplier(session.id).await?;
        let archives = mirrors.iter().map(|m| archive_mirror(ctx, m));
        archived = collect_results(join_all(archives).await)?.into_iter().filter(|a| *a).count();
    }
    ctx.db.mark_uninstalled(session.id).await?;
    info!("🔄️ {shop} uninstalled SynqSell. {archived} retailer mirrors archived.");
    Ok(HandlerOutcome::applied(format!("{shop} uninstalled; {archived} mirrors archived")))
}

async fn archive_mirror<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    mirror: &ImportedProduct,
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
    let product_id = mirror.shopify_product_id.as_str();
    ctx.remote("archive mirror", || ctx.store.set_product_status(&creds, product_id, ProductStatus::Archived)).await?;
    Ok(true)
}
