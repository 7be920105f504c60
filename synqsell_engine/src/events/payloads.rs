use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use store_gateway::{gid, ProductStatus, TrackingInfo};
use stripe_tools::{PaymentIntent, StripeEvent};
use synq_common::Cents;

use crate::events::{EnvelopeError, Topic};

/// The typed payload of an inbound event. There is exactly one variant per [`Topic`].
#[derive(Debug, Clone)]
pub enum EventPayload {
    OrderRoutingComplete(FulfillmentOrderRouted),
    FulfillmentCreated(FulfillmentSnapshot),
    FulfillmentUpdated(FulfillmentSnapshot),
    OrderCancelled(CancelledOrderSnapshot),
    ProductUpdated(ProductSnapshot),
    ProductDeleted(DeletedProductSnapshot),
    AppUninstalled,
    ShopRedact,
    CustomersDataRequest,
    CustomersRedact,
    PaymentSucceeded(PaymentIntent),
    PaymentFailed(PaymentIntent),
}

impl EventPayload {
    pub fn parse(topic: Topic, payload: Value) -> Result<Self, EnvelopeError> {
        let result = match topic {
            Topic::OrderRoutingComplete => Self::OrderRoutingComplete(from_value::<FulfillmentOrderRouted>(payload)?.normalise()),
            Topic::FulfillmentCreated => Self::FulfillmentCreated(from_value::<FulfillmentSnapshot>(payload)?.normalise()),
            Topic::FulfillmentUpdated => Self::FulfillmentUpdated(from_value::<FulfillmentSnapshot>(payload)?.normalise()),
            Topic::OrderCancelled => Self::OrderCancelled(from_value::<CancelledOrderSnapshot>(payload)?.normalise()),
            Topic::ProductUpdated => Self::ProductUpdated(from_value::<ProductSnapshot>(payload)?.normalise()),
            Topic::ProductDeleted => Self::ProductDeleted(from_value::<DeletedProductSnapshot>(payload)?.normalise()),
            Topic::AppUninstalled => Self::AppUninstalled,
            Topic::ShopRedact => Self::ShopRedact,
            Topic::CustomersDataRequest => Self::CustomersDataRequest,
            Topic::CustomersRedact => Self::CustomersRedact,
            Topic::PaymentSucceeded => Self::PaymentSucceeded(payment_intent(payload)?),
            Topic::PaymentFailed => Self::PaymentFailed(payment_intent(payload)?),
        };
        Ok(result)
    }
}

fn from_value<T: for<'de> Deserialize<'de>>(payload: Value) -> Result<T, EnvelopeError> {
    serde_json::from_value(payload).map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))
}

fn payment_intent(payload: Value) -> Result<PaymentIntent, EnvelopeError> {
    let event = from_value::<StripeEvent>(payload)?;
    event
        .payment_intent()
        .ok_or_else(|| EnvelopeError::InvalidPayload(format!("Stripe event {} does not carry a payment intent", event.id)))
}

/// Store ids arrive as JSON numbers in REST-style webhooks and as strings elsewhere.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }
    match Id::deserialize(d)? {
        Id::Number(n) => Ok(n.to_string()),
        Id::Text(s) => Ok(s),
    }
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id_string")] String);
    Ok(Option::<Wrapper>::deserialize(d)?.map(|w| w.0))
}

fn number_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Qty {
        Number(i64),
        Text(String),
    }
    match Qty::deserialize(d)? {
        Qty::Number(n) => Ok(n),
        Qty::Text(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

//--------------------------------------   Order routing   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentOrderRouted {
    pub fulfillment_order: RoutedFulfillmentOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedFulfillmentOrder {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl FulfillmentOrderRouted {
    fn normalise(mut self) -> Self {
        self.fulfillment_order.id = gid::to_gid(gid::FULFILLMENT_ORDER, &self.fulfillment_order.id);
        self
    }
}

//--------------------------------------    Fulfillments    --------------------------------------------------------
/// A `fulfillments/create` or `fulfillments/update` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub shipment_status: Option<String>,
    #[serde(default)]
    pub tracking_company: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub line_items: Vec<FulfillmentLineSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentLineSnapshot {
    /// The order line item id
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub quantity: i64,
}

impl FulfillmentSnapshot {
    fn normalise(mut self) -> Self {
        self.id = gid::to_gid(gid::FULFILLMENT, &self.id);
        self.order_id = gid::to_gid(gid::ORDER, &self.order_id);
        for line in &mut self.line_items {
            line.id = gid::to_gid(gid::LINE_ITEM, &line.id);
        }
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    pub fn is_delivered(&self) -> bool {
        self.shipment_status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("delivered"))
    }

    pub fn tracking(&self) -> TrackingInfo {
        TrackingInfo {
            company: self.tracking_company.clone(),
            number: self.tracking_number.clone(),
            url: self.tracking_url.clone(),
        }
    }
}

//--------------------------------------   Cancelled orders   ------------------------------------------------------
/// An `orders/cancelled` snapshot. Refunds are cumulative: every refund ever issued on the order is listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledOrderSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub line_items: Vec<CancelledLineSnapshot>,
    #[serde(default)]
    pub refunds: Vec<RefundSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledLineSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundSnapshot {
    #[serde(default)]
    pub refund_line_items: Vec<RefundLineSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundLineSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub line_item_id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub quantity: i64,
}

impl CancelledOrderSnapshot {
    fn normalise(mut self) -> Self {
        self.id = gid::to_gid(gid::ORDER, &self.id);
        for line in &mut self.line_items {
            line.id = gid::to_gid(gid::LINE_ITEM, &line.id);
        }
        for line in self.refunds.iter_mut().flat_map(|r| r.refund_line_items.iter_mut()) {
            line.line_item_id = gid::to_gid(gid::LINE_ITEM, &line.line_item_id);
        }
        self
    }

    /// The cumulative cancelled quantity per supplier line item id.
    ///
    /// Returns `None` when the snapshot carries no refund lines, which means the whole order was cancelled.
    pub fn cancelled_quantities(&self) -> Option<HashMap<String, i64>> {
        let mut result = HashMap::new();
        for line in self.refunds.iter().flat_map(|r| r.refund_line_items.iter()) {
            *result.entry(line.line_item_id.clone()).or_insert(0) += line.quantity;
        }
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }
}

//--------------------------------------      Products      --------------------------------------------------------
/// A `products/update` snapshot. Only the fields SynqSell synchronises are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub variants: Vec<ProductVariantSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariantSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub price: String,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub inventory_item_id: Option<String>,
    #[serde(default)]
    pub inventory_quantity: i64,
}

impl ProductSnapshot {
    fn normalise(mut self) -> Self {
        self.id = gid::to_gid(gid::PRODUCT, &self.id);
        for v in &mut self.variants {
            v.id = gid::to_gid(gid::PRODUCT_VARIANT, &v.id);
            v.inventory_item_id = v.inventory_item_id.take().map(|id| gid::to_gid(gid::INVENTORY_ITEM, id));
        }
        self
    }

    pub fn product_status(&self) -> Result<ProductStatus, EnvelopeError> {
        self.status.parse::<ProductStatus>().map_err(|e| EnvelopeError::InvalidPayload(e.to_string()))
    }
}

impl ProductVariantSnapshot {
    pub fn price(&self) -> Result<Cents, EnvelopeError> {
        self.price
            .parse::<Cents>()
            .map_err(|e| EnvelopeError::InvalidPayload(format!("Invalid price for variant {}. {e}", self.id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedProductSnapshot {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

impl DeletedProductSnapshot {
    fn normalise(mut self) -> Self {
        self.id = gid::to_gid(gid::PRODUCT, &self.id);
        self
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn fulfillment_ids_are_normalised() {
        let payload = json!({
            "id": 4412, "order_id": "gid://shopify/Order/77", "status": "success", "shipment_status": "delivered",
            "tracking_company": "UPS", "tracking_number": "1Z", "tracking_url": null,
            "line_items": [{ "id": 901, "quantity": 2, "title": "Mug" }]
        });
        let EventPayload::FulfillmentUpdated(f) = EventPayload::parse(Topic::FulfillmentUpdated, payload).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(f.id, "gid://shopify/Fulfillment/4412");
        assert_eq!(f.order_id, "gid://shopify/Order/77");
        assert_eq!(f.line_items[0].id, "gid://shopify/LineItem/901");
        assert!(f.is_delivered());
        assert!(!f.is_cancelled());
        assert_eq!(f.tracking().company.as_deref(), Some("UPS"));
    }

    #[test]
    fn cancelled_quantities_sum_refund_lines() {
        let payload = json!({
            "id": 10,
            "line_items": [{ "id": 1, "quantity": 3 }, { "id": 2, "quantity": 1 }],
            "refunds": [
                { "refund_line_items": [{ "line_item_id": 1, "quantity": 1 }] },
                { "refund_line_items": [{ "line_item_id": 1, "quantity": "2" }] }
            ]
        });
        let EventPayload::OrderCancelled(o) = EventPayload::parse(Topic::OrderCancelled, payload).unwrap() else {
            panic!("wrong variant");
        };
        let quantities = o.cancelled_quantities().unwrap();
        assert_eq!(quantities.len(), 1);
        assert_eq!(quantities["gid://shopify/LineItem/1"], 3);

        let whole = json!({ "id": 11, "line_items": [{ "id": 1, "quantity": 3 }], "refunds": [] });
        let EventPayload::OrderCancelled(o) = EventPayload::parse(Topic::OrderCancelled, whole).unwrap() else {
            panic!("wrong variant");
        };
        assert!(o.cancelled_quantities().is_none());
    }

    #[test]
    fn product_snapshot() {
        let payload = json!({
            "id": 632910392, "title": "IPod Nano", "status": "active", "body_html": "<p>ignored</p>",
            "variants": [{ "id": 808950810, "price": "199.00", "inventory_item_id": 808950810, "inventory_quantity": 10 }]
        });
        let EventPayload::ProductUpdated(p) = EventPayload::parse(Topic::ProductUpdated, payload).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(p.id, "gid://shopify/Product/632910392");
        assert_eq!(p.product_status().unwrap(), ProductStatus::Active);
        assert_eq!(p.variants[0].price().unwrap(), Cents::from(19900));
        assert_eq!(p.variants[0].inventory_item_id.as_deref(), Some("gid://shopify/InventoryItem/808950810"));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let err = EventPayload::parse(Topic::FulfillmentCreated, json!({ "order_id": 1 })).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidPayload(_)));
        let err = EventPayload::parse(
            Topic::PaymentSucceeded,
            json!({ "id": "evt_1", "type": "charge.succeeded", "data": { "object": { "object": "charge" } } }),
        )
        .unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidPayload(_)));
    }

    #[test]
    fn routed_fulfillment_order() {
        let payload = json!({ "fulfillment_order": { "id": "gid://shopify/FulfillmentOrder/1", "status": "open" } });
        let EventPayload::OrderRoutingComplete(r) = EventPayload::parse(Topic::OrderRoutingComplete, payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(r.fulfillment_order.id, "gid://shopify/FulfillmentOrder/1");
    }
}
