//! # Stripe tools
//!
//! SynqSell pays suppliers with Stripe destination charges: the retailer's saved payment method is charged, the
//! platform keeps an application fee, and the remainder is transferred to the supplier's connected account.
//!
//! [`StripeClient`] talks to the Stripe REST API directly and implements the [`PaymentProcessor`] trait, which is
//! what the reconciliation engine depends on. Every charge carries an idempotency key so that a re-delivered event
//! can never charge the retailer twice.
mod api;
mod config;
mod data_objects;
mod error;
mod processor;
mod webhook;

pub use api::StripeClient;
pub use config::StripeConfig;
pub use data_objects::{DestinationCharge, PaymentIntent, PaymentIntentStatus, StripeEvent};
pub use error::PaymentProcessorError;
pub use processor::PaymentProcessor;
pub use webhook::{verify_webhook_signature, DEFAULT_SIGNATURE_TOLERANCE_SECS};
