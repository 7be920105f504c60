use futures_util::future::join_all;
use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    db_types::Role,
    errors::ReconciliationError,
    handlers::{collect_results, product_deleted::delete_mirror, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `shop/redact`, sent 48 hours after a store uninstalled SynqSell. Everything tied to the store is removed. A store
/// that has already been redacted is a no-op.
pub async fn handle<B, S, P>(ctx: HandlerContext<'_, B, S, P>, shop: &str) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let Some(session) = ctx.db.fetch_session_by_shop(shop).await? else {
        return Ok(HandlerOutcome::skipped(format!("{shop} has already been redacted")));
    };
    if ctx.has_role(&session, Role::Supplier).await? {
        let mirrors = ctx.db.fetch_imported_products_for_supplier(session.id).await?;
        let deletions = mirrors.iter().map(|m| delete_mirror(ctx, m));
        collect_results(join_all(deletions).await)?;
        debug!("🔄️ {} retailer mirrors of {shop} deleted", mirrors.len());
    }
    if ctx.has_role(&session, Role::Retailer).await? {
        let count = ctx.db.delete_imported_products_for_retailer(session.id).await?;
        debug!("🔄️ {count} mirrors held by {shop} deleted");
    }
    ctx.db.delete_stripe_integrations(session.id).await?;
    ctx.db.delete_session(session.id).await?;
    info!("🔄️ {shop} redacted");
    Ok(HandlerOutcome::applied(format!("{shop} redacted")))
}
