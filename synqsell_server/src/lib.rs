//! # SynqSell server
//! A thin HTTP ingress in front of the reconciliation engine. It is responsible for:
//! * Receiving webhook deliveries from Shopify and Stripe, and checking their signatures.
//! * Wrapping each delivery in an event envelope and handing it to the [`EventCoordinator`].
//! * Translating the coordinator's report into a status code that tells the sender whether to re-deliver.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/shopify/webhook`: Every Shopify webhook topic SynqSell subscribes to. HMAC checked.
//! * `/stripe/webhook`: Stripe payment intent notifications. Signature checked.
//! * `/events/batch`: A batch of envelopes from a message queue, signed with the queue secret.
//!
//! [`EventCoordinator`]: synqsell_engine::EventCoordinator

pub mod cli;
pub mod config;
pub mod errors;

pub mod data_objects;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
