//! # Domain repositories
//!
//! These traits are the only way handlers read or write persisted state. Each write that guards against duplicate
//! processing (orders, fulfillments, payments, mirrors) is backed by a uniqueness constraint and reports duplicates
//! as [`InsertResult::AlreadyExists`] instead of failing.
//!
//! * [`SessionManagement`] covers installed stores, roles and Stripe integrations.
//! * [`CatalogManagement`] covers supplier products and retailer mirrors.
//! * [`OrderManagement`], [`FulfillmentManagement`] and [`PaymentManagement`] cover the order lifecycle.
//! * [`SynqsellDatabase`] bundles all of them with the [`IdempotencyLedger`].
mod catalog_management;
mod data_objects;
mod fulfillment_management;
mod order_management;
mod payment_management;
mod session_management;

pub use catalog_management::CatalogManagement;
pub use data_objects::InsertResult;
pub use fulfillment_management::FulfillmentManagement;
pub use order_management::OrderManagement;
pub use payment_management::PaymentManagement;
pub use session_management::SessionManagement;

use crate::ledger::IdempotencyLedger;

pub trait SynqsellDatabase:
    Clone
    + SessionManagement
    + CatalogManagement
    + OrderManagement
    + FulfillmentManagement
    + PaymentManagement
    + IdempotencyLedger
{
    /// The URL of the database
    fn url(&self) -> &str;
}
