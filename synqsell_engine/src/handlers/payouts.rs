//! Supplier payouts.
//!
//! When a linked fulfillment is delivered, the retailer pays the supplier for the shipped units through a Stripe
//! destination charge. The charge amount is what the retailer owes at the unit prices frozen when the order was split;
//! the platform keeps the difference between that and the supplier's profit as its application fee.
use std::collections::HashMap;

use log::*;
use store_gateway::StoreApi;
use stripe_tools::{DestinationCharge, PaymentIntent, PaymentProcessor};
use synq_common::Cents;

use crate::{
    db_types::{Fulfillment, FulfillmentLineItem, NewPayment, Order, OrderLineItem, PaymentRecordStatus, PaymentStatus},
    errors::ReconciliationError,
    handlers::{HandlerContext, HandlerOutcome},
    lifecycle::{counts_as_paid, payment_status_for},
    traits::SynqsellDatabase,
};

/// Derived from the fulfillment id, so that a repeated charge attempt returns the original payment intent.
pub fn idempotency_key(fulfillment_id: i64) -> String {
    format!("synqsell-fulfillment-{fulfillment_id}")
}

/// `(amount, application_fee)` owed for the fulfilled line items.
pub fn payout_amounts(fulfilled: &[FulfillmentLineItem], order_lines: &[OrderLineItem]) -> (Cents, Cents) {
    let by_id = order_lines.iter().map(|l| (l.id, l)).collect::<HashMap<_, _>>();
    fulfilled.iter().filter_map(|f| by_id.get(&f.order_line_item_id).map(|l| (f.quantity, *l))).fold(
        (Cents::default(), Cents::default()),
        |(amount, fee), (qty, line)| {
            (amount + line.retailer_payment * qty, fee + (line.retailer_payment - line.supplier_profit) * qty)
        },
    )
}

fn record_status(intent: &PaymentIntent) -> PaymentRecordStatus {
    if intent.is_succeeded() {
        PaymentRecordStatus::Succeeded
    } else if intent.is_failed() {
        PaymentRecordStatus::Failed
    } else {
        PaymentRecordStatus::Initiated
    }
}

/// Charges the retailer for a delivered fulfillment. At most one payment exists per fulfillment.
pub async fn initiate_payment<B, S, P>(
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
        return Ok(HandlerOutcome::skipped(format!("fulfillment #{} is cancelled", fulfillment.id)));
    }
    if order.payment_status == PaymentStatus::Cancelled {
        return Ok(HandlerOutcome::skipped(format!("order #{} is cancelled", order.id)));
    }
    if let Some(payment) = ctx.db.fetch_payment_for_fulfillment(fulfillment.id).await? {
        return Ok(HandlerOutcome::skipped(format!(
            "payment #{} ({}) already exists for fulfillment #{}",
            payment.id, payment.status, fulfillment.id
        )));
    }
    let fulfilled = ctx.db.fetch_fulfillment_line_items(fulfillment.id).await?;
    let order_lines = ctx.db.fetch_order_line_items(order.id).await?;
    let (amount, application_fee) = payout_amounts(&fulfilled, &order_lines);
    if amount <= Cents::default() {
        return Ok(HandlerOutcome::skipped(format!("nothing is owed for fulfillment #{}", fulfillment.id)));
    }
    let customer = ctx
        .db
        .fetch_customer_account(order.retailer_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("Stripe customer of retailer #{}", order.retailer_id)))?;
    let connect = ctx
        .db
        .fetch_connect_account(order.supplier_id)
        .await?
        .ok_or_else(|| ReconciliationError::not_found(format!("Stripe account of supplier #{}", order.supplier_id)))?;
    let charge = DestinationCharge {
        amount,
        application_fee,
        currency: order.currency.clone(),
        customer_id: customer.stripe_customer_id,
        payment_method_id: customer.payment_method_id,
        destination_account_id: connect.stripe_account_id,
        idempotency_key: idempotency_key(fulfillment.id),
        description: Some(format!("SynqSell order {}", order.shopify_supplier_order_id)),
        metadata: vec![
            ("order_id".to_string(), order.id.to_string()),
            ("fulfillment_id".to_string(), fulfillment.id.to_string()),
        ],
    };
    let intent = ctx.remote("destination charge", || ctx.payments.create_destination_charge(&charge)).await?;
    let status = record_status(&intent);
    let payment = NewPayment {
        fulfillment_id: fulfillment.id,
        stripe_payment_intent_id: intent.id.clone(),
        amount,
        application_fee,
        status,
    };
    let result = ctx.db.insert_payment(payment).await?;
    if !result.is_inserted() {
        return Err(ReconciliationError::InvariantViolation(format!(
            "payment for fulfillment #{} was recorded by a concurrent delivery",
            fulfillment.id
        )));
    }
    info!(
        "🔄️💳️ Payment #{} of {amount} (fee {application_fee}) for fulfillment #{} is {status}",
        result.id(),
        fulfillment.id
    );
    match status {
        PaymentRecordStatus::Succeeded => {
            refresh_order_payment_status(ctx, order.id).await?;
        },
        PaymentRecordStatus::Failed => {
            error!(
                "🔄️💳️ Payment intent {} for fulfillment #{} failed: {}",
                intent.id,
                fulfillment.id,
                intent.failure_message().unwrap_or_else(|| intent.status.to_string())
            );
        },
        PaymentRecordStatus::Initiated => {},
    }
    Ok(HandlerOutcome::applied(format!("payment #{} {status} for fulfillment #{}", result.id(), fulfillment.id)))
}

/// Recomputes the order's payment status from its succeeded payments. Cancelled orders are left alone.
pub async fn refresh_order_payment_status<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    order_id: i64,
) -> Result<PaymentStatus, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let order =
        ctx.db.fetch_order(order_id).await?.ok_or_else(|| ReconciliationError::not_found(format!("order #{order_id}")))?;
    if order.payment_status == PaymentStatus::Cancelled {
        return Ok(order.payment_status);
    }
    let line_items = ctx.db.fetch_order_line_items(order_id).await?;
    let mut paid_lines = Vec::new();
    for fulfillment in ctx.db.fetch_fulfillments_for_order(order_id).await? {
        let paid = ctx.db.fetch_payment_for_fulfillment(fulfillment.id).await?.is_some_and(|p| counts_as_paid(&p));
        if paid {
            paid_lines.extend(ctx.db.fetch_fulfillment_line_items(fulfillment.id).await?);
        }
    }
    let status = payment_status_for(&line_items, &paid_lines);
    if status != order.payment_status {
        ctx.db.update_order_payment_status(order_id, status).await?;
        info!("🔄️💳️ Order #{order_id} payment status changed from {} to {status}", order.payment_status);
    }
    Ok(status)
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(id: i64, retailer_payment: i64, supplier_profit: i64) -> OrderLineItem {
        OrderLineItem {
            id,
            order_id: 1,
            variant_id: None,
            shopify_supplier_line_item_id: String::new(),
            shopify_retailer_line_item_id: String::new(),
            shopify_retailer_fulfillment_order_line_item_id: String::new(),
            quantity: 5,
            cancelled_quantity: 0,
            retailer_payment: Cents::from(retailer_payment),
            supplier_profit: Cents::from(supplier_profit),
        }
    }

    #[test]
    fn amounts_use_frozen_unit_prices() {
        let order_lines = [line(1, 800, 720), line(2, 1500, 1400)];
        let fulfilled = [
            FulfillmentLineItem { id: 1, fulfillment_id: 9, order_line_item_id: 1, quantity: 3 },
            FulfillmentLineItem { id: 2, fulfillment_id: 9, order_line_item_id: 2, quantity: 1 },
        ];
        let (amount, fee) = payout_amounts(&fulfilled, &order_lines);
        assert_eq!(amount, Cents::from(3 * 800 + 1500));
        assert_eq!(fee, Cents::from(3 * 80 + 100));
        assert_eq!(idempotency_key(9), "synqsell-fulfillment-9");
    }
}
