use sqlx::SqliteConnection;
use store_gateway::TrackingInfo;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{Fulfillment, FulfillmentLineItem, FulfillmentStatus, NewFulfillment},
    InsertResult,
};

/// Not atomic on its own; run it inside a transaction.
pub async fn idempotent_insert(
    fulfillment: NewFulfillment,
    conn: &mut SqliteConnection,
) -> Result<InsertResult, DatabaseError> {
    if let Some(f) = fetch_by_supplier_id(&fulfillment.supplier_shopify_fulfillment_id, conn).await? {
        return Ok(InsertResult::AlreadyExists(f.id));
    }
    if let Some(f) = fetch_by_retailer_id(&fulfillment.retailer_shopify_fulfillment_id, conn).await? {
        return Ok(InsertResult::AlreadyExists(f.id));
    }
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO fulfillments (
                order_id,
                supplier_shopify_fulfillment_id,
                retailer_shopify_fulfillment_id,
                status,
                shipment_status,
                tracking_company,
                tracking_number,
                tracking_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id;
        "#,
    )
    .bind(fulfillment.order_id)
    .bind(&fulfillment.supplier_shopify_fulfillment_id)
    .bind(&fulfillment.retailer_shopify_fulfillment_id)
    .bind(FulfillmentStatus::Open)
    .bind(&fulfillment.shipment_status)
    .bind(&fulfillment.tracking.company)
    .bind(&fulfillment.tracking.number)
    .bind(&fulfillment.tracking.url)
    .fetch_one(&mut *conn)
    .await?;
    for (order_line_item_id, quantity) in fulfillment.line_items {
        sqlx::query(
            "INSERT INTO fulfillment_line_items (fulfillment_id, order_line_item_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(id)
        .bind(order_line_item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(InsertResult::Inserted(id))
}

pub async fn fetch_fulfillment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Fulfillment>, DatabaseError> {
    let f = sqlx::query_as("SELECT * FROM fulfillments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(f)
}

pub async fn fetch_by_supplier_id(
    supplier_fulfillment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Fulfillment>, DatabaseError> {
    let f = sqlx::query_as("SELECT * FROM fulfillments WHERE supplier_shopify_fulfillment_id = $1")
        .bind(supplier_fulfillment_id)
        .fetch_optional(conn)
        .await?;
    Ok(f)
}

pub async fn fetch_by_retailer_id(
    retailer_fulfillment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Fulfillment>, DatabaseError> {
    let f = sqlx::query_as("SELECT * FROM fulfillments WHERE retailer_shopify_fulfillment_id = $1")
        .bind(retailer_fulfillment_id)
        .fetch_optional(conn)
        .await?;
    Ok(f)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Fulfillment>, DatabaseError> {
    let fulfillments = sqlx::query_as("SELECT * FROM fulfillments WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(fulfillments)
}

pub async fn fetch_line_items(
    fulfillment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<FulfillmentLineItem>, DatabaseError> {
    let items = sqlx::query_as("SELECT * FROM fulfillment_line_items WHERE fulfillment_id = $1 ORDER BY id")
        .bind(fulfillment_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn relink_retailer_fulfillment(
    fulfillment_id: i64,
    retailer_fulfillment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE fulfillments SET retailer_shopify_fulfillment_id = $1 WHERE id = $2")
        .bind(retailer_fulfillment_id)
        .bind(fulfillment_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn update_status(
    fulfillment_id: i64,
    status: FulfillmentStatus,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE fulfillments SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(fulfillment_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn update_tracking(
    fulfillment_id: i64,
    tracking: &TrackingInfo,
    shipment_status: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
            UPDATE fulfillments SET
                tracking_company = $1,
                tracking_number = $2,
                tracking_url = $3,
                shipment_status = COALESCE($4, shipment_status)
            WHERE id = $5
        "#,
    )
    .bind(&tracking.company)
    .bind(&tracking.number)
    .bind(&tracking.url)
    .bind(shipment_status)
    .bind(fulfillment_id)
    .execute(conn)
    .await?;
    Ok(())
}
