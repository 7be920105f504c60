use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::events::{EventPayload, Topic};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
    #[error("Malformed event envelope: {0}")]
    MalformedEnvelope(String),
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// The raw, untyped form of an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub topic: String,
    pub shop: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn new<S: Into<String>>(event_id: S, topic: Topic, shop: S, payload: Value) -> Self {
        Self { event_id: event_id.into(), topic: topic.as_str().to_string(), shop: shop.into(), payload }
    }

    /// Reads an envelope from a JSON value, e.g. one element of a queue batch.
    pub fn from_json(value: Value) -> Result<Self, EnvelopeError> {
        let envelope: Self =
            serde_json::from_value(value).map_err(|e| EnvelopeError::MalformedEnvelope(e.to_string()))?;
        if envelope.event_id.trim().is_empty() {
            return Err(EnvelopeError::MalformedEnvelope("event_id is empty".into()));
        }
        Ok(envelope)
    }

    /// Validates the topic and payload.
    pub fn parse(self) -> Result<InboundEvent, EnvelopeError> {
        let topic = self.topic.parse::<Topic>()?;
        let payload = EventPayload::parse(topic, self.payload)?;
        Ok(InboundEvent { event_id: self.event_id, topic, shop: self.shop.trim().to_ascii_lowercase(), payload })
    }
}

/// An event that passed validation and can be dispatched to a handler.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub event_id: String,
    pub topic: Topic,
    /// The shop domain the event was raised by. Empty for payment processor events.
    pub shop: String,
    pub payload: EventPayload,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelopes_are_validated() {
        let raw = json!({ "event_id": "e1", "topic": "products/delete", "shop": "Supplier.myshopify.com",
            "payload": { "id": 5 } });
        let event = EventEnvelope::from_json(raw).unwrap().parse().unwrap();
        assert_eq!(event.topic, Topic::ProductDeleted);
        assert_eq!(event.shop, "supplier.myshopify.com");
        assert!(matches!(event.payload, EventPayload::ProductDeleted(ref p) if p.id == "gid://shopify/Product/5"));

        let err = EventEnvelope::from_json(json!({ "topic": "products/delete" })).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedEnvelope(_)));
        let err = EventEnvelope::from_json(json!({ "event_id": " ", "topic": "x", "shop": "s" })).unwrap_err();
        assert!(matches!(err, EnvelopeError::MalformedEnvelope(_)));

        let unknown = EventEnvelope::new("e2", Topic::AppUninstalled, "s", json!({}));
        let unknown = EventEnvelope { topic: "carts/update".into(), ..unknown };
        assert_eq!(unknown.parse().unwrap_err(), EnvelopeError::UnknownTopic("carts/update".into()));
    }
}
