use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use synq_common::Cents;

use crate::GatewayError;

//--------------------------------------   Fulfillment orders   ---------------------------------------------------
/// A store's routing unit: the line items of one order that were assigned to one fulfillment location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulfillmentOrderDetails {
    pub id: String,
    /// The order that the fulfillment order belongs to
    pub order_id: String,
    pub status: String,
    pub assigned_location_id: Option<String>,
    pub destination: Option<MailingAddress>,
    pub line_items: Vec<FulfillmentOrderLineItem>,
    /// Fulfillments already created against this fulfillment order
    pub fulfillment_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulfillmentOrderLineItem {
    /// The fulfillment-order line item id. This is what fulfillments are created against.
    pub id: String,
    /// The order line item id. This is what refunds are created against.
    pub line_item_id: String,
    pub variant_id: Option<String>,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddress {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country_code: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

impl MailingAddress {
    /// The `MailingAddressInput` representation used by `orderCreate`.
    pub fn to_input(&self) -> serde_json::Value {
        serde_json::json!({
            "firstName": self.first_name,
            "lastName": self.last_name,
            "company": self.company,
            "address1": self.address1,
            "address2": self.address2,
            "city": self.city,
            "provinceCode": self.province,
            "countryCode": self.country_code,
            "zip": self.zip,
            "phone": self.phone,
        })
    }
}

//--------------------------------------        Orders          ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStoreOrder {
    pub line_items: Vec<NewOrderLine>,
    pub currency: String,
    pub shipping_address: Option<MailingAddress>,
    pub tags: Vec<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price: Cents,
}

/// An order as it exists on a store after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOrder {
    pub id: String,
    pub line_items: Vec<StoreOrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOrderLine {
    pub id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
}

impl StoreOrder {
    /// Finds the store line item created for `variant_id`. Each variant appears at most once per SynqSell order.
    pub fn line_for_variant(&self, variant_id: &str) -> Option<&StoreOrderLine> {
        self.line_items.iter().find(|l| l.variant_id.as_deref() == Some(variant_id))
    }
}

//--------------------------------------      Fulfillments      ---------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub company: Option<String>,
    pub number: Option<String>,
    pub url: Option<String>,
}

impl TrackingInfo {
    pub fn is_empty(&self) -> bool {
        self.company.is_none() && self.number.is_none() && self.url.is_none()
    }

    pub fn to_input(&self) -> serde_json::Value {
        serde_json::json!({ "company": self.company, "number": self.number, "url": self.url })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStoreFulfillment {
    pub fulfillment_order_id: String,
    pub line_items: Vec<NewFulfillmentLine>,
    pub tracking: TrackingInfo,
    pub notify_customer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFulfillmentLine {
    /// The fulfillment-order line item id
    pub fulfillment_order_line_item_id: String,
    pub quantity: i64,
}

//--------------------------------------        Refunds         ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefund {
    pub order_id: String,
    pub line_items: Vec<NewRefundLine>,
    pub note: Option<String>,
    pub notify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefundLine {
    pub line_item_id: String,
    pub quantity: i64,
}

//--------------------------------------        Catalog         ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPrice {
    pub variant_id: String,
    pub price: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryQuantity {
    pub inventory_item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Active => write!(f, "ACTIVE"),
            ProductStatus::Draft => write!(f, "DRAFT"),
            ProductStatus::Archived => write!(f, "ARCHIVED"),
        }
    }
}

impl FromStr for ProductStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DRAFT" => Ok(Self::Draft),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(GatewayError::JsonError(format!("Invalid product status: {other}"))),
        }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------  GraphQL response shapes  ------------------------------------------------
#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdOnly {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFulfillmentOrder {
    pub id: String,
    pub status: String,
    pub order: IdOnly,
    pub assigned_location: Option<RawAssignedLocation>,
    pub destination: Option<MailingAddress>,
    pub line_items: Nodes<RawFulfillmentOrderLineItem>,
    pub fulfillments: Nodes<IdOnly>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAssignedLocation {
    pub location: Option<IdOnly>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFulfillmentOrderLineItem {
    pub id: String,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
    pub line_item: IdOnly,
    pub variant: Option<IdOnly>,
}

impl From<RawFulfillmentOrder> for FulfillmentOrderDetails {
    fn from(raw: RawFulfillmentOrder) -> Self {
        Self {
            id: raw.id,
            order_id: raw.order.id,
            status: raw.status,
            assigned_location_id: raw.assigned_location.and_then(|a| a.location).map(|l| l.id),
            destination: raw.destination,
            line_items: raw
                .line_items
                .nodes
                .into_iter()
                .map(|li| FulfillmentOrderLineItem {
                    id: li.id,
                    line_item_id: li.line_item.id,
                    variant_id: li.variant.map(|v| v.id),
                    total_quantity: li.total_quantity,
                    remaining_quantity: li.remaining_quantity,
                })
                .collect(),
            fulfillment_ids: raw.fulfillments.nodes.into_iter().map(|f| f.id).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawOrder {
    pub id: String,
    pub line_items: Nodes<RawOrderLine>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOrderLine {
    pub id: String,
    pub variant: Option<IdOnly>,
    pub quantity: i64,
}

impl From<RawOrder> for StoreOrder {
    fn from(raw: RawOrder) -> Self {
        Self {
            id: raw.id,
            line_items: raw
                .line_items
                .nodes
                .into_iter()
                .map(|l| StoreOrderLine { id: l.id, variant_id: l.variant.map(|v| v.id), quantity: l.quantity })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSuggestedTransaction {
    pub parent_transaction: Option<IdOnly>,
    pub gateway: Option<String>,
    pub amount_set: RawMoneyBag,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMoneyBag {
    pub shop_money: RawMoney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMoney {
    pub amount: String,
    pub currency_code: String,
}
