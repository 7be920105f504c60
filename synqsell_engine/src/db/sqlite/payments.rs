use sqlx::SqliteConnection;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewPayment, Payment, PaymentRecordStatus},
    InsertResult,
};

pub async fn idempotent_insert(payment: NewPayment, conn: &mut SqliteConnection) -> Result<InsertResult, DatabaseError> {
    if let Some(p) = fetch_for_fulfillment(payment.fulfillment_id, conn).await? {
        return Ok(InsertResult::AlreadyExists(p.id));
    }
    let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
        r#"
            INSERT INTO payments (fulfillment_id, stripe_payment_intent_id, amount, application_fee, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id;
        "#,
    )
    .bind(payment.fulfillment_id)
    .bind(&payment.stripe_payment_intent_id)
    .bind(payment.amount)
    .bind(payment.application_fee)
    .bind(payment.status)
    .fetch_one(&mut *conn)
    .await;
    match result {
        Ok((id,)) => Ok(InsertResult::Inserted(id)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let existing = fetch_by_intent(&payment.stripe_payment_intent_id, conn).await?;
            let id = existing.map(|p| p.id).unwrap_or_default();
            Ok(InsertResult::AlreadyExists(id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_for_fulfillment(
    fulfillment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, DatabaseError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE fulfillment_id = $1")
        .bind(fulfillment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_by_intent(payment_intent_id: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, DatabaseError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE stripe_payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, DatabaseError> {
    let payments = sqlx::query_as(
        r#"
            SELECT p.* FROM payments p
            JOIN fulfillments f ON f.id = p.fulfillment_id
            WHERE f.order_id = $1
            ORDER BY p.id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

pub async fn update_status(
    payment_id: i64,
    status: PaymentRecordStatus,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE payments SET status = $1 WHERE id = $2").bind(status).bind(payment_id).execute(conn).await?;
    Ok(())
}
