use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewOrder, Order, OrderLineItem, PaymentStatus},
    InsertResult,
};

/// Supplier-scoped sub-orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order and its line items atomically. A second order for the same supplier and retailer
    /// fulfillment order is reported as [`InsertResult::AlreadyExists`].
    async fn insert_order(&self, order: NewOrder) -> Result<InsertResult, DatabaseError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, DatabaseError>;

    async fn fetch_order_for_fulfillment_order(
        &self,
        supplier_id: i64,
        fulfillment_order_id: &str,
    ) -> Result<Option<Order>, DatabaseError>;

    async fn fetch_order_by_supplier_order_id(
        &self,
        supplier_id: i64,
        shopify_order_id: &str,
    ) -> Result<Option<Order>, DatabaseError>;

    async fn fetch_orders_for_fulfillment_order(&self, fulfillment_order_id: &str) -> Result<Vec<Order>, DatabaseError>;

    async fn fetch_order_line_items(&self, order_id: i64) -> Result<Vec<OrderLineItem>, DatabaseError>;

    /// Sets the cumulative cancelled quantity of each `(order_line_item_id, cancelled_quantity)` pair.
    async fn record_cancelled_quantities(&self, order_id: i64, quantities: &[(i64, i64)]) -> Result<(), DatabaseError>;

    async fn update_order_payment_status(&self, order_id: i64, status: PaymentStatus) -> Result<(), DatabaseError>;
}
