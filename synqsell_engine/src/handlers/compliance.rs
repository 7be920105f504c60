use log::*;

use crate::{errors::ReconciliationError, events::Topic, handlers::HandlerOutcome};

/// `customers/data_request` and `customers/redact`. SynqSell stores no customer data, so there is nothing to report
/// or erase.
pub fn handle(topic: Topic, shop: &str) -> Result<HandlerOutcome, ReconciliationError> {
    info!("🔄️ {topic} for {shop} acknowledged. No customer data is held.");
    Ok(HandlerOutcome::applied(format!("{topic} acknowledged")))
}
