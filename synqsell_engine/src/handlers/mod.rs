//! # Reconciliation handlers
//!
//! One handler per inbound topic. Handlers are stateless: everything they need is either in the event payload or
//! re-read from the database, so events can arrive in any order and any number of times.
//!
//! Handlers never call each other. The only way one handler influences another is through persisted rows.
//!
//! A handler returns a [`HandlerOutcome`] on success. [`ReconciliationError::NotFound`] and
//! [`ReconciliationError::InvariantViolation`] are expected under re-delivery and out-of-order arrival, so
//! [`dispatch`] resolves both into [`HandlerOutcome::Skipped`]. Every other error is passed up to the coordinator.
mod app_uninstalled;
mod compliance;
mod fulfillment_created;
mod fulfillment_updated;
mod order_cancelled;
mod order_routing;
mod payment_confirmation;
pub mod payouts;
mod product_deleted;
mod product_updated;
mod retailer_fulfillments;
mod shop_redact;

use std::{fmt::Display, future::Future};

use log::*;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    config::EngineConfig,
    db_types::{Role, Session},
    errors::ReconciliationError,
    events::{EventPayload, InboundEvent},
    retry::Transient,
    traits::SynqsellDatabase,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The event changed persisted or remote state.
    Applied(String),
    /// The event required no work.
    Skipped(String),
}

impl HandlerOutcome {
    pub fn applied<S: Into<String>>(msg: S) -> Self {
        Self::Applied(msg.into())
    }

    pub fn skipped<S: Into<String>>(msg: S) -> Self {
        Self::Skipped(msg.into())
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, HandlerOutcome::Applied(_))
    }

    pub fn message(&self) -> &str {
        match self {
            HandlerOutcome::Applied(m) | HandlerOutcome::Skipped(m) => m.as_str(),
        }
    }
}

/// The collaborators of a single handler invocation.
pub struct HandlerContext<'a, B, S, P> {
    pub db: &'a B,
    pub store: &'a S,
    pub payments: &'a P,
    pub config: &'a EngineConfig,
}

impl<B, S, P> Clone for HandlerContext<'_, B, S, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, S, P> Copy for HandlerContext<'_, B, S, P> {}

impl<'a, B, S, P> HandlerContext<'a, B, S, P>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    pub fn new(db: &'a B, store: &'a S, payments: &'a P, config: &'a EngineConfig) -> Self {
        Self { db, store, payments, config }
    }

    /// Runs a remote call under the configured retry policy and classifies its failure.
    pub async fn remote<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, ReconciliationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
        ReconciliationError: From<E>,
    {
        let result = self.config.retry.run(label, operation).await?;
        Ok(result)
    }

    pub async fn session_for_shop(&self, shop: &str) -> Result<Session, ReconciliationError> {
        self.db
            .fetch_session_by_shop(shop)
            .await?
            .ok_or_else(|| ReconciliationError::not_found(format!("session for {shop}")))
    }

    pub async fn session(&self, id: i64) -> Result<Session, ReconciliationError> {
        self.db.fetch_session(id).await?.ok_or_else(|| ReconciliationError::not_found(format!("session #{id}")))
    }

    pub async fn has_role(&self, session: &Session, role: Role) -> Result<bool, ReconciliationError> {
        let roles = self.db.fetch_roles(session.id).await?;
        Ok(roles.contains(&role))
    }
}

/// Routes the event to its handler.
pub async fn dispatch<B, S, P>(
    ctx: HandlerContext<'_, B, S, P>,
    event: &InboundEvent,
) -> Result<HandlerOutcome, ReconciliationError>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    let shop = event.shop.as_str();
    let result = match &event.payload {
        EventPayload::OrderRoutingComplete(p) => order_routing::handle(ctx, shop, p).await,
        EventPayload::FulfillmentCreated(p) => fulfillment_created::handle(ctx, shop, p).await,
        EventPayload::FulfillmentUpdated(p) => fulfillment_updated::handle(ctx, shop, p).await,
        EventPayload::OrderCancelled(p) => order_cancelled::handle(ctx, shop, p).await,
        EventPayload::ProductUpdated(p) => product_updated::handle(ctx, shop, p).await,
        EventPayload::ProductDeleted(p) => product_deleted::handle(ctx, shop, p).await,
        EventPayload::AppUninstalled => app_uninstalled::handle(ctx, shop).await,
        EventPayload::ShopRedact => shop_redact::handle(ctx, shop).await,
        EventPayload::CustomersDataRequest | EventPayload::CustomersRedact => compliance::handle(event.topic, shop),
        EventPayload::PaymentSucceeded(intent) => payment_confirmation::handle_succeeded(ctx, intent).await,
        EventPayload::PaymentFailed(intent) => payment_confirmation::handle_failed(ctx, intent).await,
    };
    match result {
        Err(ReconciliationError::NotFound(what)) => {
            debug!("🔄️ [{}] {}: nothing to do, {what} was not found", event.event_id, event.topic);
            Ok(HandlerOutcome::Skipped(format!("{what} not found")))
        },
        Err(ReconciliationError::InvariantViolation(what)) => {
            warn!("🔄️ [{}] {}: {what}. The work was already done.", event.event_id, event.topic);
            Ok(HandlerOutcome::Skipped(what))
        },
        other => other,
    }
}

/// Collects the results of concurrent per-store work. All results are inspected; the first retryable error is
/// preferred so that the event is re-delivered if any store can still catch up.
pub(crate) fn collect_results<T>(results: Vec<Result<T, ReconciliationError>>) -> Result<Vec<T>, ReconciliationError> {
    let mut values = Vec::with_capacity(results.len());
    let mut failure: Option<ReconciliationError> = None;
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => {
                error!("🔄️ Store update failed. {e}");
                let replace = match &failure {
                    None => true,
                    Some(existing) => !existing.is_retryable() && e.is_retryable(),
                };
                if replace {
                    failure = Some(e);
                }
            },
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(values),
    }
}
