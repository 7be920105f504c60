use log::*;
use store_gateway::StoreApi;
use stripe_tools::{PaymentIntent, PaymentProcessor};

use crate::{
    db_types::PaymentRecordStatus,
    errors::ReconciliationError,
    handlers::{payouts, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// `payment_intent.succeeded`: completes `DELIVERED_PAYMENT_INITIATED -> PAID` once every active unit is paid.
pub async fn handle_succeeded<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    intent: &PaymentIntent,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let payment = ctx
        .db
        .fetch_payment_by_intent(&intent.id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("payment for intent {}", intent.id)))?;
    if payment.status != PaymentRecordStatus::Succeeded {
        ctx.db.update_payment_record_status(payment.id, PaymentRecordStatus::Succeeded).await?;
    }
    let fulfillment = ctx
        .db
        .fetch_fulfillment(payment.fulfillment_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("fulfillment #{}", payment.fulfillment_id)))?;
    let status = payouts::refresh_order_payment_status(ctx, fulfillment.order_id).await?;
    debug!("🔄️💳️ Payment #{} succeeded. Order #{} is {status}", payment.id, fulfillment.order_id);
    Ok(HandlerOutcome::applied(format!("payment #{} succeeded; order #{} is {status}", payment.id, fulfillment.order_id)))
}

/// `payment_intent.payment_failed`: the payment is flagged for manual follow-up. No automatic retry is made.
pub async fn handle_failed<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    intent: &PaymentIntent,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let payment = ctx
        .db
        .fetch_payment_by_intent(&intent.id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("payment for intent {}", intent.id)))?;
    if payment.status != PaymentRecordStatus::Initiated {
        return Ok(HandlerOutcome::skipped(format!("payment #{} is already {}", payment.id, payment.status)));
    }
    ctx.db.update_payment_record_status(payment.id, PaymentRecordStatus::Failed).await?;
    error!(
        "🔄️💳️ Payment #{} for fulfillment #{} failed and needs attention: {}",
        payment.id,
        payment.fulfillment_id,
        intent.failure_message().unwrap_or_else(|| intent.status.to_string())
    );
    Ok(HandlerOutcome::applied(format!("payment #{} failed", payment.id)))
}
