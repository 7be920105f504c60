use std::{fmt::Display, str::FromStr};

use crate::events::EnvelopeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    OrderRoutingComplete,
    FulfillmentCreated,
    FulfillmentUpdated,
    OrderCancelled,
    ProductUpdated,
    ProductDeleted,
    AppUninstalled,
    ShopRedact,
    CustomersDataRequest,
    CustomersRedact,
    PaymentSucceeded,
    PaymentFailed,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::OrderRoutingComplete,
        Topic::FulfillmentCreated,
        Topic::FulfillmentUpdated,
        Topic::OrderCancelled,
        Topic::ProductUpdated,
        Topic::ProductDeleted,
        Topic::AppUninstalled,
        Topic::ShopRedact,
        Topic::CustomersDataRequest,
        Topic::CustomersRedact,
        Topic::PaymentSucceeded,
        Topic::PaymentFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrderRoutingComplete => "fulfillment_orders/order_routing_complete",
            Topic::FulfillmentCreated => "fulfillments/create",
            Topic::FulfillmentUpdated => "fulfillments/update",
            Topic::OrderCancelled => "orders/cancelled",
            Topic::ProductUpdated => "products/update",
            Topic::ProductDeleted => "products/delete",
            Topic::AppUninstalled => "app/uninstalled",
            Topic::ShopRedact => "shop/redact",
            Topic::CustomersDataRequest => "customers/data_request",
            Topic::CustomersRedact => "customers/redact",
            Topic::PaymentSucceeded => "payment_intent.succeeded",
            Topic::PaymentFailed => "payment_intent.payment_failed",
        }
    }

    /// Topics that originate from Stripe rather than from a store.
    pub fn is_payment_topic(&self) -> bool {
        matches!(self, Topic::PaymentSucceeded | Topic::PaymentFailed)
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = EnvelopeError;

    /// Shopify sends topics in `a/b` form in headers and as `A_B` in some queue integrations. Both are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        Topic::ALL
            .iter()
            .find(|t| t.as_str() == normalised || t.as_str().replace('/', "_") == normalised)
            .copied()
            .ok_or_else(|| EnvelopeError::UnknownTopic(s.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn topics_parse() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert_eq!("FULFILLMENTS_CREATE".parse::<Topic>().unwrap(), Topic::FulfillmentCreated);
        assert_eq!("orders/create".parse::<Topic>(), Err(EnvelopeError::UnknownTopic("orders/create".into())));
    }
}
