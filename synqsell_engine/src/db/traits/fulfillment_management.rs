use crate::{
    db::sqlite::DatabaseError,
    db_types::{Fulfillment, FulfillmentLineItem, FulfillmentStatus, NewFulfillment},
    InsertResult,
};
use store_gateway::TrackingInfo;

/// Shipments linked across the supplier and retailer stores.
#[allow(async_fn_in_trait)]
pub trait FulfillmentManagement {
    /// Stores a linked fulfillment with its line items. Either store-side id being known already is reported as
    /// [`InsertResult::AlreadyExists`].
    async fn insert_fulfillment(&self, fulfillment: NewFulfillment) -> Result<InsertResult, DatabaseError>;

    async fn fetch_fulfillment(&self, id: i64) -> Result<Option<Fulfillment>, DatabaseError>;

    async fn fetch_fulfillment_by_supplier_id(&self, supplier_fulfillment_id: &str)
        -> Result<Option<Fulfillment>, DatabaseError>;

    async fn fetch_fulfillment_by_retailer_id(&self, retailer_fulfillment_id: &str)
        -> Result<Option<Fulfillment>, DatabaseError>;

    async fn fetch_fulfillments_for_order(&self, order_id: i64) -> Result<Vec<Fulfillment>, DatabaseError>;

    async fn fetch_fulfillment_line_items(&self, fulfillment_id: i64) -> Result<Vec<FulfillmentLineItem>, DatabaseError>;

    /// Points the fulfillment at a new retailer-side fulfillment after the previous one was recreated.
    async fn relink_retailer_fulfillment(&self, fulfillment_id: i64, retailer_fulfillment_id: &str)
        -> Result<(), DatabaseError>;

    async fn update_fulfillment_status(&self, fulfillment_id: i64, status: FulfillmentStatus) -> Result<(), DatabaseError>;

    async fn update_fulfillment_tracking(
        &self,
        fulfillment_id: i64,
        tracking: &TrackingInfo,
        shipment_status: Option<&str>,
    ) -> Result<(), DatabaseError>;
}
