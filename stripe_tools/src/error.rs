use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PaymentProcessorError {
    #[error("Could not initialize the payment client: {0}")]
    Initialization(String),
    #[error("Request to the payment processor failed before a response was received: {message}")]
    Transport { message: String, timed_out: bool },
    #[error("Payment processor error. Status {status}. {error_type}: {message}")]
    RemoteApi { status: u16, error_type: String, code: Option<String>, message: String },
    #[error("Could not deserialize the payment processor response: {0}")]
    JsonError(String),
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

impl PaymentProcessorError {
    /// Timeouts, connection failures, rate limiting and Stripe-side errors may succeed when re-sent with the same
    /// idempotency key. Card declines and invalid requests will not.
    pub fn is_transient(&self) -> bool {
        match self {
            PaymentProcessorError::Transport { .. } => true,
            PaymentProcessorError::RemoteApi { status, error_type, .. } => {
                *status == 429 || *status >= 500 || error_type == "api_error"
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::PaymentProcessorError;

    fn remote(status: u16, error_type: &str) -> PaymentProcessorError {
        PaymentProcessorError::RemoteApi {
            status,
            error_type: error_type.to_string(),
            code: None,
            message: String::default(),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(remote(500, "api_error").is_transient());
        assert!(remote(429, "rate_limit_error").is_transient());
        assert!(!remote(402, "card_error").is_transient());
        assert!(!remote(400, "invalid_request_error").is_transient());
        assert!(PaymentProcessorError::Transport { message: "reset".into(), timed_out: false }.is_transient());
        assert!(!PaymentProcessorError::InvalidSignature("mismatch".into()).is_transient());
    }
}
