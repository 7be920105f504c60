//! # Event coordinator
//!
//! The entry point of the engine. The coordinator accepts a batch of raw event envelopes, validates each one, checks
//! the idempotency ledger and runs the matching handler. Every message in a batch is processed independently and
//! concurrently: one message failing does not affect its siblings.
//!
//! The ledger is written only after a handler returned successfully, so a message that failed is processed again in
//! full when it is re-delivered.
use futures_util::future::join_all;
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store_gateway::StoreApi;
use stripe_tools::PaymentProcessor;

use crate::{
    config::EngineConfig,
    events::{EnvelopeError, EventEnvelope},
    handlers::{dispatch, HandlerContext, HandlerOutcome},
    traits::SynqsellDatabase,
};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventStatus {
    Processed { message: String },
    Skipped { message: String },
    AlreadyProcessed,
    IgnoredTopic,
    Rejected { reason: String },
    Failed { error: String, retryable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    pub event_id: Option<String>,
    pub topic: Option<String>,
    #[serde(flatten)]
    pub status: EventStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEvent {
    pub event_id: String,
    pub topic: String,
    pub error: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEvent {
    pub event_id: Option<String>,
    pub reason: String,
}

/// The outcome of a batch, grouped by result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub already_processed: Vec<String>,
    pub ignored: Vec<String>,
    pub rejected: Vec<RejectedEvent>,
    pub failed: Vec<FailedEvent>,
}

impl BatchReport {
    pub fn has_retryable_failures(&self) -> bool {
        self.failed.iter().any(|f| f.retryable)
    }

    pub fn total(&self) -> usize {
        self.processed.len()
            + self.skipped.len()
            + self.already_processed.len()
            + self.ignored.len()
            + self.rejected.len()
            + self.failed.len()
    }

    fn add(&mut self, report: EventReport) {
        let id = report.event_id.clone().unwrap_or_default();
        match report.status {
            EventStatus::Processed { .. } => self.processed.push(id),
            EventStatus::Skipped { .. } => self.skipped.push(id),
            EventStatus::AlreadyProcessed => self.already_processed.push(id),
            EventStatus::IgnoredTopic => self.ignored.push(id),
            EventStatus::Rejected { reason } => self.rejected.push(RejectedEvent { event_id: report.event_id, reason }),
            EventStatus::Failed { error, retryable } => {
                self.failed.push(FailedEvent { event_id: id, topic: report.topic.unwrap_or_default(), error, retryable })
            },
        }
    }
}

impl FromIterator<EventReport> for BatchReport {
    fn from_iter<I: IntoIterator<Item = EventReport>>(iter: I) -> Self {
        let mut batch = BatchReport::default();
        for report in iter {
            batch.add(report);
        }
        batch
    }
}

pub struct EventCoordinator<B, S, P> {
    db: B,
    store: S,
    payments: P,
    config: EngineConfig,
}

impl<B, S, P> EventCoordinator<B, S, P>
where
    B: SynqsellDatabase,
    S: StoreApi,
    P: PaymentProcessor,
{
    pub fn new(db: B, store: S, payments: P, config: EngineConfig) -> Self {
        Self { db, store, payments, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn context(&self) -> HandlerContext<'_, B, S, P> {
        HandlerContext::new(&self.db, &self.store, &self.payments, &self.config)
    }

    /// Processes every message of the batch concurrently.
    pub async fn process_batch(&self, messages: Vec<Value>) -> BatchReport {
        let count = messages.len();
        let reports = join_all(messages.into_iter().map(|m| self.process_json(m))).await;
        let batch = reports.into_iter().collect::<BatchReport>();
        info!(
            "📬️ Batch of {count} processed: {} processed, {} skipped, {} duplicates, {} ignored, {} rejected, {} failed",
            batch.processed.len(),
            batch.skipped.len(),
            batch.already_processed.len(),
            batch.ignored.len(),
            batch.rejected.len(),
            batch.failed.len()
        );
        batch
    }

    pub async fn process_json(&self, message: Value) -> EventReport {
        let event_id = message["event_id"].as_str().map(String::from);
        match EventEnvelope::from_json(message) {
            Ok(envelope) => self.process_event(envelope).await,
            Err(e) => {
                warn!("📬️ Rejected message {event_id:?}. {e}");
                EventReport { event_id, topic: None, status: EventStatus::Rejected { reason: e.to_string() } }
            },
        }
    }

    pub async fn process_event(&self, envelope: EventEnvelope) -> EventReport {
        let event_id = envelope.event_id.clone();
        let topic = envelope.topic.clone();
        let report = |status| EventReport { event_id: Some(event_id.clone()), topic: Some(topic.clone()), status };
        let event = match envelope.parse() {
            Ok(event) => event,
            Err(EnvelopeError::UnknownTopic(t)) => {
                info!("📬️ Event {event_id} has unsupported topic {t}. Acknowledged without processing.");
                return report(EventStatus::IgnoredTopic);
            },
            Err(e) => {
                warn!("📬️ Event {event_id} ({topic}) rejected. {e}");
                return report(EventStatus::Rejected { reason: e.to_string() });
            },
        };
        match self.db.has_processed(&event_id).await {
            Ok(true) => {
                debug!("📬️ Event {event_id} ({topic}) has already been processed");
                return report(EventStatus::AlreadyProcessed);
            },
            Ok(false) => {},
            Err(e) => {
                error!("📬️ Could not check the ledger for event {event_id}. {e}");
                return report(EventStatus::Failed { error: e.to_string(), retryable: true });
            },
        }
        trace!("📬️ Dispatching event {event_id} ({topic}) from {}", event.shop);
        let outcome = match dispatch(self.context(), &event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let retryable = e.is_retryable();
                error!("📬️ Event {event_id} ({topic}) failed. Retryable: {retryable}. {e}");
                return report(EventStatus::Failed { error: e.to_string(), retryable });
            },
        };
        if let Err(e) = self.db.mark_processed(&event_id, event.topic.as_str()).await {
            error!("📬️ Event {event_id} was handled but could not be recorded in the ledger. {e}");
            return report(EventStatus::Failed { error: e.to_string(), retryable: true });
        }
        match outcome {
            HandlerOutcome::Applied(message) => {
                info!("📬️ Event {event_id} ({topic}): {message}");
                report(EventStatus::Processed { message })
            },
            HandlerOutcome::Skipped(message) => {
                debug!("📬️ Event {event_id} ({topic}) skipped: {message}");
                report(EventStatus::Skipped { message })
            },
        }
    }
}
