use crate::{DestinationCharge, PaymentIntent, PaymentProcessorError};

/// The payment operations the reconciliation engine performs.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    /// Creates and confirms a destination charge. Calling this twice with the same idempotency key must return the
    /// same payment intent rather than charging twice.
    async fn create_destination_charge(&self, charge: &DestinationCharge)
        -> Result<PaymentIntent, PaymentProcessorError>;
}
