use log::*;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewOrder, Order, OrderLineItem, PaymentStatus},
    InsertResult,
};

/// Inserts the order and its line items, unless an order for the same supplier and retailer fulfillment order exists.
/// Not atomic on its own; run it inside a transaction.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<InsertResult, DatabaseError> {
    let existing =
        fetch_order_for_fulfillment_order(order.supplier_id, &order.shopify_retailer_fulfillment_order_id, conn)
            .await?;
    if let Some(existing) = existing {
        return Ok(InsertResult::AlreadyExists(existing.id));
    }
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO orders (
                supplier_id,
                retailer_id,
                shopify_supplier_order_id,
                shopify_retailer_order_id,
                shopify_retailer_fulfillment_order_id,
                payment_status,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id;
        "#,
    )
    .bind(order.supplier_id)
    .bind(order.retailer_id)
    .bind(&order.shopify_supplier_order_id)
    .bind(&order.shopify_retailer_order_id)
    .bind(&order.shopify_retailer_fulfillment_order_id)
    .bind(PaymentStatus::Incomplete)
    .bind(&order.currency)
    .fetch_one(&mut *conn)
    .await?;
    for item in order.line_items {
        sqlx::query(
            r#"
                INSERT INTO order_line_items (
                    order_id,
                    variant_id,
                    shopify_supplier_line_item_id,
                    shopify_retailer_line_item_id,
                    shopify_retailer_fulfillment_order_line_item_id,
                    quantity,
                    retailer_payment,
                    supplier_profit
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(item.variant_id)
        .bind(item.shopify_supplier_line_item_id)
        .bind(item.shopify_retailer_line_item_id)
        .bind(item.shopify_retailer_fulfillment_order_line_item_id)
        .bind(item.quantity)
        .bind(item.retailer_payment)
        .bind(item.supplier_profit)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Order {} for supplier #{} saved with id {id}", order.shopify_supplier_order_id, order.supplier_id);
    Ok(InsertResult::Inserted(id))
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, DatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_for_fulfillment_order(
    supplier_id: i64,
    fulfillment_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, DatabaseError> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE supplier_id = $1 AND shopify_retailer_fulfillment_order_id = $2")
            .bind(supplier_id)
            .bind(fulfillment_order_id)
            .fetch_optional(conn)
            .await?;
    Ok(order)
}

pub async fn fetch_order_by_supplier_order_id(
    supplier_id: i64,
    shopify_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, DatabaseError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE supplier_id = $1 AND shopify_supplier_order_id = $2")
        .bind(supplier_id)
        .bind(shopify_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_fulfillment_order(
    fulfillment_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, DatabaseError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE shopify_retailer_fulfillment_order_id = $1 ORDER BY id")
        .bind(fulfillment_order_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLineItem>, DatabaseError> {
    let items = sqlx::query_as("SELECT * FROM order_line_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Cancelled quantities are cumulative and never exceed the ordered quantity.
pub async fn set_cancelled_quantity(
    order_id: i64,
    line_item_id: i64,
    cancelled_quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
            UPDATE order_line_items
            SET cancelled_quantity = MIN(quantity, MAX(cancelled_quantity, $1))
            WHERE id = $2 AND order_id = $3
        "#,
    )
    .bind(cancelled_quantity)
    .bind(line_item_id)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_payment_status(
    order_id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE orders SET payment_status = $1 WHERE id = $2").bind(status).bind(order_id).execute(conn).await?;
    Ok(())
}
