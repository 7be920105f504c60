//! The per-order lifecycle.
//!
//! ```text
//! CREATED -> FULFILLMENT_LINKED -> DELIVERED_PAYMENT_INITIATED -> PAID
//!    \              |
//!     +-----> CANCELLED
//! ```
//!
//! The state is never stored. It is derived from the persisted order, fulfillment and payment rows every time a
//! handler needs it, so an event can be processed correctly no matter which events came before it.
use std::fmt::Display;

use crate::db_types::{
    Fulfillment,
    FulfillmentLineItem,
    Order,
    OrderLineItem,
    Payment,
    PaymentRecordStatus,
    PaymentStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderLifecycle {
    Created,
    FulfillmentLinked,
    DeliveredPaymentInitiated,
    Paid,
    Cancelled,
}

impl Display for OrderLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderLifecycle::Created => "CREATED",
            OrderLifecycle::FulfillmentLinked => "FULFILLMENT_LINKED",
            OrderLifecycle::DeliveredPaymentInitiated => "DELIVERED_PAYMENT_INITIATED",
            OrderLifecycle::Paid => "PAID",
            OrderLifecycle::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl OrderLifecycle {
    pub fn derive(order: &Order, fulfillments: &[Fulfillment], payments: &[Payment]) -> Self {
        match order.payment_status {
            PaymentStatus::Cancelled => return OrderLifecycle::Cancelled,
            PaymentStatus::Paid => return OrderLifecycle::Paid,
            _ => {},
        }
        if !payments.is_empty() {
            OrderLifecycle::DeliveredPaymentInitiated
        } else if fulfillments.iter().any(Fulfillment::is_open) {
            OrderLifecycle::FulfillmentLinked
        } else {
            OrderLifecycle::Created
        }
    }

    /// An order can only be cancelled before any money has moved.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderLifecycle::Created | OrderLifecycle::FulfillmentLinked)
    }
}

/// The order payment status implied by the units that have been paid for.
///
/// `paid_lines` holds the line items of every fulfillment whose payment succeeded. The order is PAID once every
/// active (not cancelled) unit has been paid for.
pub fn payment_status_for(line_items: &[OrderLineItem], paid_lines: &[FulfillmentLineItem]) -> PaymentStatus {
    let active: i64 = line_items.iter().map(OrderLineItem::active_quantity).sum();
    let paid: i64 = paid_lines.iter().map(|l| l.quantity).sum();
    if active > 0 && paid >= active {
        PaymentStatus::Paid
    } else if paid > 0 {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Incomplete
    }
}

/// Whether a payment has reached a state in which it counts towards the order being paid.
pub fn counts_as_paid(payment: &Payment) -> bool {
    payment.status == PaymentRecordStatus::Succeeded
}
