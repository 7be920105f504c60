use std::fmt::Display;

use serde::{Deserialize, Serialize};
use synqsell_engine::{BatchReport, EventReport, EventStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Whether the sender of a delivery should send it again.
pub trait RedeliveryHint {
    fn needs_redelivery(&self) -> bool;
}

impl RedeliveryHint for EventReport {
    fn needs_redelivery(&self) -> bool {
        matches!(self.status, EventStatus::Failed { retryable: true, .. })
    }
}

impl RedeliveryHint for BatchReport {
    fn needs_redelivery(&self) -> bool {
        self.has_retryable_failures()
    }
}
