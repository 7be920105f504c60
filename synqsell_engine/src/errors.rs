use std::fmt::Display;

use store_gateway::GatewayError;
use stripe_tools::PaymentProcessorError;
use thiserror::Error;

use crate::{db::sqlite::DatabaseError, events::EnvelopeError};

/// The failure taxonomy every reconciliation handler reports in.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Network failures, timeouts, 429 and 5xx responses. The event should be re-delivered.
    #[error("Transient remote failure: {0}")]
    TransientRemote(String),
    /// The remote API understood the request and rejected it. Re-delivery will not help.
    #[error("Remote API rejected the request: {0}")]
    RemoteUser(String),
    /// An expected row or remote object is missing.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A write was rejected by a uniqueness constraint, i.e. the work has already been done.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ReconciliationError {
    /// Whether the event should be handed back to the delivery platform for another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconciliationError::TransientRemote(_) => true,
            ReconciliationError::Database(e) => !e.is_unique_violation(),
            _ => false,
        }
    }

    pub fn not_found<S: Display>(what: S) -> Self {
        Self::NotFound(what.to_string())
    }
}

impl From<GatewayError> for ReconciliationError {
    fn from(e: GatewayError) -> Self {
        if e.is_transient() {
            ReconciliationError::TransientRemote(e.to_string())
        } else {
            ReconciliationError::RemoteUser(e.to_string())
        }
    }
}

impl From<PaymentProcessorError> for ReconciliationError {
    fn from(e: PaymentProcessorError) -> Self {
        if e.is_transient() {
            ReconciliationError::TransientRemote(e.to_string())
        } else {
            ReconciliationError::RemoteUser(e.to_string())
        }
    }
}

impl From<EnvelopeError> for ReconciliationError {
    fn from(e: EnvelopeError) -> Self {
        ReconciliationError::InvalidPayload(e.to_string())
    }
}
