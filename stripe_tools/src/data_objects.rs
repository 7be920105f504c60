use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use synq_common::Cents;

/// A charge against the retailer's saved payment method, with the proceeds less `application_fee` transferred to the
/// supplier's connected account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCharge {
    pub amount: Cents,
    pub application_fee: Cents,
    /// ISO currency code. Stripe expects it in lowercase; the client converts it.
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    /// The supplier's connected account
    pub destination_account_id: String,
    /// Sent as the `Idempotency-Key` header. Re-sending a charge with the same key returns the original intent.
    pub idempotency_key: String,
    pub description: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl DestinationCharge {
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.value().to_string()),
            ("currency".to_string(), self.currency.to_lowercase()),
            ("customer".to_string(), self.customer_id.clone()),
            ("payment_method".to_string(), self.payment_method_id.clone()),
            ("confirm".to_string(), "true".to_string()),
            ("off_session".to_string(), "true".to_string()),
            ("application_fee_amount".to_string(), self.application_fee.value().to_string()),
            ("transfer_data[destination]".to_string(), self.destination_account_id.clone()),
        ];
        if let Some(description) = &self.description {
            form.push(("description".to_string(), description.clone()));
        }
        for (k, v) in &self.metadata {
            form.push((format!("metadata[{k}]"), v.clone()));
        }
        form
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentIntentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentIntentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Processing => "processing",
            PaymentIntentStatus::RequiresCapture => "requires_capture",
            PaymentIntentStatus::Canceled => "canceled",
            PaymentIntentStatus::Succeeded => "succeeded",
            PaymentIntentStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub last_payment_error: Option<Value>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, PaymentIntentStatus::Canceled | PaymentIntentStatus::RequiresPaymentMethod)
    }

    /// The decline or failure reason Stripe attached to the intent, if any.
    pub fn failure_message(&self) -> Option<String> {
        self.last_payment_error.as_ref().and_then(|e| e["message"].as_str()).map(String::from)
    }
}

/// A Stripe webhook event envelope. Only the fields SynqSell reads are modelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    /// Interprets the event's object as a payment intent. Returns `None` for other object types.
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        if self.data.object["object"].as_str() != Some("payment_intent") {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn destination_charge_form() {
        let charge = DestinationCharge {
            amount: Cents::from(2400),
            application_fee: Cents::from(400),
            currency: "USD".into(),
            customer_id: "cus_1".into(),
            payment_method_id: "pm_1".into(),
            destination_account_id: "acct_1".into(),
            idempotency_key: "synqsell-fulfillment-1".into(),
            description: None,
            metadata: vec![("fulfillment_id".into(), "1".into())],
        };
        let form = charge.to_form();
        assert!(form.contains(&("amount".into(), "2400".into())));
        assert!(form.contains(&("currency".into(), "usd".into())));
        assert!(form.contains(&("application_fee_amount".into(), "400".into())));
        assert!(form.contains(&("transfer_data[destination]".into(), "acct_1".into())));
        assert!(form.contains(&("metadata[fulfillment_id]".into(), "1".into())));
    }

    #[test]
    fn payment_intent_events() {
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_1",
            "type": "payment_intent.payment_failed",
            "data": { "object": {
                "object": "payment_intent", "id": "pi_1", "status": "requires_payment_method",
                "amount": 100, "currency": "usd",
                "last_payment_error": { "message": "Your card was declined." }
            }}
        }))
        .unwrap();
        let intent = event.payment_intent().unwrap();
        assert_eq!(intent.id, "pi_1");
        assert!(intent.is_failed());
        assert_eq!(intent.failure_message().as_deref(), Some("Your card was declined."));

        let other: StripeEvent = serde_json::from_value(json!({
            "id": "evt_2", "type": "charge.succeeded", "data": { "object": { "object": "charge", "id": "ch_1" } }
        }))
        .unwrap();
        assert!(other.payment_intent().is_none());
    }

    #[test]
    fn unknown_statuses_are_tolerated() {
        let intent: PaymentIntent = serde_json::from_value(json!({ "id": "pi_2", "status": "brand_new" })).unwrap();
        assert_eq!(intent.status, PaymentIntentStatus::Unknown);
    }
}
