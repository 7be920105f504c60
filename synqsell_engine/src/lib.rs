//! SynqSell Reconciliation Engine
//!
//! SynqSell connects supplier stores with retailer stores. Retailers import supplier products into their own
//! catalogs, and when a retailer sells one, the engine mirrors the sale back to the supplier, relays fulfillments
//! and tracking to the retailer, and charges the retailer on delivery with a Stripe destination charge that pays the
//! supplier.
//!
//! This library contains the event-driven core of that system. It is transport-agnostic: something else (the
//! `synqsell_server` crate, a queue consumer, or a test) hands it batches of event envelopes.
//!
//! The library is divided into these sections:
//! 1. Persistence ([`mod@traits`], [`db_types`]). The handlers only ever talk to the repository traits.
//!    [`SqliteDatabase`] is the bundled backend.
//! 2. Inbound events ([`mod@events`]). Topic routing, envelope validation and payload parsing.
//! 3. Handlers ([`mod@handlers`]), one per topic, plus the [`splitter`] that turns a retailer fulfillment order into
//!    per-supplier orders.
//! 4. The [`EventCoordinator`], which ties the idempotency [`ledger`], the handlers and the remote clients together.
mod db;

pub mod config;
pub mod coordinator;
pub mod db_types;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod lifecycle;
pub mod pricing;
pub mod retry;
pub mod splitter;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::EngineConfig;
pub use coordinator::{BatchReport, EventCoordinator, EventReport, EventStatus};
pub use db::{
    sqlite::{db_url, DatabaseError, SqliteDatabase},
    traits,
};
pub use db::traits::{
    CatalogManagement,
    FulfillmentManagement,
    InsertResult,
    OrderManagement,
    PaymentManagement,
    SessionManagement,
    SynqsellDatabase,
};
pub use errors::ReconciliationError;
pub use ledger::IdempotencyLedger;
pub use retry::RetryPolicy;
