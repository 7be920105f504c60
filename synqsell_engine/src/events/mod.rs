//! Inbound events.
//!
//! Every event reaches the engine as an [`EventEnvelope`]: an id, a topic discriminator, the shop domain it came from
//! and a topic-specific JSON payload. [`EventEnvelope::parse`] turns it into an [`InboundEvent`] whose payload is one
//! of a closed set of typed snapshots. Anything that does not fit is rejected here, before a handler runs.
mod envelope;
mod payloads;
mod topic;

pub use envelope::{EnvelopeError, EventEnvelope, InboundEvent};
pub use payloads::{
    CancelledLineSnapshot,
    CancelledOrderSnapshot,
    DeletedProductSnapshot,
    EventPayload,
    FulfillmentLineSnapshot,
    FulfillmentOrderRouted,
    FulfillmentSnapshot,
    ProductSnapshot,
    ProductVariantSnapshot,
    RefundLineSnapshot,
    RefundSnapshot,
    RoutedFulfillmentOrder,
};
pub use topic::Topic;
