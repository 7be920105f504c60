//! # Idempotency ledger
//!
//! A durable set of processed event ids. The coordinator checks it before dispatching an event and writes to it only
//! after the handler returned successfully, so a crash mid-handler leads to re-delivery rather than a dropped event.
//!
//! The ledger is a fast path. Two concurrent deliveries of the same event can both pass the check, which is why every
//! write a handler performs is independently protected by a uniqueness constraint.
use crate::db::sqlite::DatabaseError;

#[allow(async_fn_in_trait)]
pub trait IdempotencyLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DatabaseError>;

    /// Records the event as processed. Recording the same event twice is a no-op.
    async fn mark_processed(&self, event_id: &str, topic: &str) -> Result<(), DatabaseError>;
}
