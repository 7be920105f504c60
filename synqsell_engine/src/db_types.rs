use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use store_gateway::{ProductStatus, StoreCredentials, TrackingInfo};
use synq_common::Cents;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} value: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new<S: Into<String>>(kind: &'static str, value: S) -> Self {
        Self { kind, value: value.into() }
    }
}

//--------------------------------------       Session        ---------------------------------------------------------
/// One installed store.
#[derive(Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub shop: String,
    pub access_token: String,
    pub is_app_uninstalled: bool,
    pub storefront_access_token: Option<String>,
    /// The location SynqSell products are stocked at on a retailer store. Fulfillment orders assigned elsewhere are
    /// not SynqSell orders.
    pub fulfillment_location_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("is_app_uninstalled", &self.is_app_uninstalled)
            .field("fulfillment_location_id", &self.fulfillment_location_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn credentials(&self) -> StoreCredentials {
        StoreCredentials::new(self.shop.as_str(), self.access_token.as_str())
    }

    pub fn is_active(&self) -> bool {
        !self.is_app_uninstalled
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub shop: String,
    pub access_token: String,
    pub storefront_access_token: Option<String>,
    pub fulfillment_location_id: Option<String>,
}

impl NewSession {
    pub fn new<S: Into<String>, T: Into<String>>(shop: S, access_token: T) -> Self {
        Self { shop: shop.into(), access_token: access_token.into(), ..Default::default() }
    }

    pub fn with_fulfillment_location<S: Into<String>>(mut self, location_id: S) -> Self {
        self.fulfillment_location_id = Some(location_id.into());
        self
    }
}

//--------------------------------------         Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Supplier,
    Retailer,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Supplier => write!(f, "SUPPLIER"),
            Role::Retailer => write!(f, "RETAILER"),
        }
    }
}

//--------------------------------------   Stripe integrations   ------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct StripeConnectAccount {
    pub id: i64,
    pub session_id: i64,
    pub stripe_account_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct StripeCustomerAccount {
    pub id: i64,
    pub session_id: i64,
    pub stripe_customer_id: String,
    pub payment_method_id: String,
}

//--------------------------------------       Catalog        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: i64,
    pub supplier_id: i64,
    pub shopify_product_id: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    /// The share of the retail price the retailer keeps, in basis points.
    pub retailer_margin_bps: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub shopify_variant_id: String,
    pub retail_price: Cents,
    /// What the retailer pays per unit sold
    pub retailer_payment: Cents,
    /// What the supplier keeps per unit after the platform fee
    pub supplier_profit: Cents,
    pub inventory_quantity: i64,
    /// From `inventory_items`
    pub shopify_inventory_item_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub supplier_id: i64,
    pub shopify_product_id: String,
    pub title: String,
    pub status: ProductStatus,
    pub retailer_margin_bps: i64,
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub shopify_variant_id: String,
    pub shopify_inventory_item_id: Option<String>,
    pub retail_price: Cents,
    pub retailer_payment: Cents,
    pub supplier_profit: Cents,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantUpdate {
    pub variant_id: i64,
    pub retail_price: Cents,
    pub retailer_payment: Cents,
    pub supplier_profit: Cents,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ImportedProduct {
    pub id: i64,
    pub retailer_id: i64,
    pub product_id: i64,
    pub shopify_product_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ImportedVariant {
    pub id: i64,
    pub imported_product_id: i64,
    pub variant_id: i64,
    pub retailer_id: i64,
    pub shopify_variant_id: String,
    /// From `imported_inventory_items`
    pub shopify_inventory_item_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewImportedProduct {
    pub retailer_id: i64,
    pub product_id: i64,
    pub shopify_product_id: String,
    pub variants: Vec<NewImportedVariant>,
}

#[derive(Debug, Clone)]
pub struct NewImportedVariant {
    pub variant_id: i64,
    pub shopify_variant_id: String,
    pub shopify_inventory_item_id: Option<String>,
}

/// The supplier-side chain behind a retailer's variant: ImportedVariant → Variant → Product → supplier Session.
#[derive(Debug, Clone, FromRow)]
pub struct VariantOrigin {
    pub imported_variant_id: i64,
    pub variant_id: i64,
    pub shopify_variant_id: String,
    pub retailer_payment: Cents,
    pub supplier_profit: Cents,
    pub product_id: i64,
    pub supplier_id: i64,
}

//--------------------------------------        Orders        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Incomplete,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Incomplete => write!(f, "INCOMPLETE"),
            PaymentStatus::PartiallyPaid => write!(f, "PARTIALLY_PAID"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOMPLETE" => Ok(Self::Incomplete),
            "PARTIALLY_PAID" => Ok(Self::PartiallyPaid),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError::new("payment status", s)),
        }
    }
}

/// One supplier-scoped sub-order of a retailer fulfillment order.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub supplier_id: i64,
    pub retailer_id: i64,
    pub shopify_supplier_order_id: String,
    pub shopify_retailer_order_id: String,
    pub shopify_retailer_fulfillment_order_id: String,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: Option<i64>,
    pub shopify_supplier_line_item_id: String,
    pub shopify_retailer_line_item_id: String,
    pub shopify_retailer_fulfillment_order_line_item_id: String,
    pub quantity: i64,
    pub cancelled_quantity: i64,
    /// Unit price paid by the retailer, frozen when the order was split
    pub retailer_payment: Cents,
    /// Unit profit of the supplier, frozen when the order was split
    pub supplier_profit: Cents,
}

impl OrderLineItem {
    pub fn active_quantity(&self) -> i64 {
        (self.quantity - self.cancelled_quantity).max(0)
    }

    pub fn is_fully_cancelled(&self) -> bool {
        self.cancelled_quantity >= self.quantity
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub supplier_id: i64,
    pub retailer_id: i64,
    pub shopify_supplier_order_id: String,
    pub shopify_retailer_order_id: String,
    pub shopify_retailer_fulfillment_order_id: String,
    pub currency: String,
    pub line_items: Vec<NewOrderLineItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLineItem {
    pub variant_id: Option<i64>,
    pub shopify_supplier_line_item_id: String,
    pub shopify_retailer_line_item_id: String,
    pub shopify_retailer_fulfillment_order_line_item_id: String,
    pub quantity: i64,
    pub retailer_payment: Cents,
    pub supplier_profit: Cents,
}

//--------------------------------------     Fulfillments     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Open,
    Cancelled,
}

impl Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentStatus::Open => write!(f, "OPEN"),
            FulfillmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A shipment mirrored in both stores. Rows only exist once both sides are linked.
#[derive(Debug, Clone, FromRow)]
pub struct Fulfillment {
    pub id: i64,
    pub order_id: i64,
    pub supplier_shopify_fulfillment_id: String,
    pub retailer_shopify_fulfillment_id: String,
    pub status: FulfillmentStatus,
    pub shipment_status: Option<String>,
    pub tracking_company: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fulfillment {
    pub fn tracking(&self) -> TrackingInfo {
        TrackingInfo {
            company: self.tracking_company.clone(),
            number: self.tracking_number.clone(),
            url: self.tracking_url.clone(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == FulfillmentStatus::Open
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FulfillmentLineItem {
    pub id: i64,
    pub fulfillment_id: i64,
    pub order_line_item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewFulfillment {
    pub order_id: i64,
    pub supplier_shopify_fulfillment_id: String,
    pub retailer_shopify_fulfillment_id: String,
    pub shipment_status: Option<String>,
    pub tracking: TrackingInfo,
    /// `(order_line_item_id, quantity)` pairs
    pub line_items: Vec<(i64, i64)>,
}

//--------------------------------------       Payments       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRecordStatus {
    Initiated,
    Succeeded,
    Failed,
}

impl Display for PaymentRecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentRecordStatus::Initiated => write!(f, "INITIATED"),
            PaymentRecordStatus::Succeeded => write!(f, "SUCCEEDED"),
            PaymentRecordStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A destination charge paying a supplier for one delivered fulfillment.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: i64,
    pub fulfillment_id: i64,
    pub stripe_payment_intent_id: String,
    pub amount: Cents,
    pub application_fee: Cents,
    pub status: PaymentRecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub fulfillment_id: i64,
    pub stripe_payment_intent_id: String,
    pub amount: Cents,
    pub application_fee: Cents,
    pub status: PaymentRecordStatus,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_item_quantities() {
        let mut item = OrderLineItem {
            id: 1,
            order_id: 1,
            variant_id: Some(1),
            shopify_supplier_line_item_id: "s".into(),
            shopify_retailer_line_item_id: "r".into(),
            shopify_retailer_fulfillment_order_line_item_id: "f".into(),
            quantity: 3,
            cancelled_quantity: 1,
            retailer_payment: Cents::from(800),
            supplier_profit: Cents::from(720),
        };
        assert_eq!(item.active_quantity(), 2);
        assert!(!item.is_fully_cancelled());
        item.cancelled_quantity = 3;
        assert_eq!(item.active_quantity(), 0);
        assert!(item.is_fully_cancelled());
    }

    #[test]
    fn payment_status_strings() {
        assert_eq!(PaymentStatus::PartiallyPaid.to_string(), "PARTIALLY_PAID");
        assert_eq!("CANCELLED".parse::<PaymentStatus>().unwrap(), PaymentStatus::Cancelled);
        assert!("Paid".parse::<PaymentStatus>().is_err());
    }
}
