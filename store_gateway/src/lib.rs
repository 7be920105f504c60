//! # Store Gateway
//!
//! A uniform remote-call abstraction over a store's commerce API. Every SynqSell store, whether it acts as a supplier
//! or a retailer, is reached through the same [`ShopifyGateway`], parameterised per call by the store's
//! [`StoreCredentials`].
//!
//! The gateway is deliberately thin:
//! * it performs no caching and no retries. Retry policy belongs to the caller.
//! * every request is bounded by the configured timeout.
//! * mutation responses are inspected for the embedded `userErrors` channel, which is surfaced as
//!   [`GatewayError::UserErrors`] even though the HTTP status was 200.
//!
//! The [`StoreApi`] trait lists the typed operations the reconciliation engine relies on. `ShopifyGateway`
//! implements it against the Admin GraphQL API; tests substitute in-memory fakes.
mod api;
mod config;
mod data_objects;
mod error;
pub mod gid;
mod queries;
mod store_api;

pub use api::ShopifyGateway;
pub use config::{GatewayConfig, StoreCredentials};
pub use data_objects::{
    FulfillmentOrderDetails,
    FulfillmentOrderLineItem,
    InventoryQuantity,
    MailingAddress,
    NewFulfillmentLine,
    NewOrderLine,
    NewRefund,
    NewRefundLine,
    NewStoreFulfillment,
    NewStoreOrder,
    ProductStatus,
    StoreOrder,
    StoreOrderLine,
    TrackingInfo,
    VariantPrice,
};
pub use error::GatewayError;
pub use store_api::StoreApi;
