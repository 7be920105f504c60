use sqlx::SqliteConnection;

use crate::{
    db::sqlite::DatabaseError,
    db_types::{NewSession, Role, Session, StripeConnectAccount, StripeCustomerAccount},
};

pub async fn fetch_session(id: i64, conn: &mut SqliteConnection) -> Result<Option<Session>, DatabaseError> {
    let session = sqlx::query_as("SELECT * FROM sessions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(session)
}

pub async fn fetch_session_by_shop(shop: &str, conn: &mut SqliteConnection) -> Result<Option<Session>, DatabaseError> {
    let session = sqlx::query_as("SELECT * FROM sessions WHERE shop = $1").bind(shop).fetch_optional(conn).await?;
    Ok(session)
}

/// Inserts the session, or rotates the token of an existing one. Re-installing clears the uninstalled flag.
pub async fn upsert_session(session: NewSession, conn: &mut SqliteConnection) -> Result<Session, DatabaseError> {
    let session = sqlx::query_as(
        r#"
            INSERT INTO sessions (shop, access_token, storefront_access_token, fulfillment_location_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = excluded.access_token,
                is_app_uninstalled = FALSE,
                storefront_access_token = COALESCE(excluded.storefront_access_token, storefront_access_token),
                fulfillment_location_id = COALESCE(excluded.fulfillment_location_id, fulfillment_location_id)
            RETURNING *;
        "#,
    )
    .bind(session.shop)
    .bind(session.access_token)
    .bind(session.storefront_access_token)
    .bind(session.fulfillment_location_id)
    .fetch_one(conn)
    .await?;
    Ok(session)
}

pub async fn assign_role(session_id: i64, role: Role, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query("INSERT OR IGNORE INTO roles (session_id, role) VALUES ($1, $2)")
        .bind(session_id)
        .bind(role)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_roles(session_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Role>, DatabaseError> {
    let rows: Vec<(Role,)> = sqlx::query_as("SELECT role FROM roles WHERE session_id = $1 ORDER BY role")
        .bind(session_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(|(r,)| r).collect())
}

pub async fn mark_uninstalled(session_id: i64, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE sessions SET is_app_uninstalled = TRUE WHERE id = $1").bind(session_id).execute(conn).await?;
    Ok(())
}

pub async fn delete_session(session_id: i64, conn: &mut SqliteConnection) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = $1").bind(session_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn save_connect_account(
    session_id: i64,
    stripe_account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO stripe_connect_accounts (session_id, stripe_account_id) VALUES ($1, $2)
            ON CONFLICT (session_id) DO UPDATE SET stripe_account_id = excluded.stripe_account_id;
        "#,
    )
    .bind(session_id)
    .bind(stripe_account_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn save_customer_account(
    session_id: i64,
    stripe_customer_id: &str,
    payment_method_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO stripe_customer_accounts (session_id, stripe_customer_id, payment_method_id) VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO UPDATE SET
                stripe_customer_id = excluded.stripe_customer_id,
                payment_method_id = excluded.payment_method_id;
        "#,
    )
    .bind(session_id)
    .bind(stripe_customer_id)
    .bind(payment_method_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_connect_account(
    session_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StripeConnectAccount>, DatabaseError> {
    let account = sqlx::query_as(
        "SELECT id, session_id, stripe_account_id FROM stripe_connect_accounts WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

pub async fn fetch_customer_account(
    session_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<StripeCustomerAccount>, DatabaseError> {
    let account = sqlx::query_as(
        r#"SELECT id, session_id, stripe_customer_id, payment_method_id
        FROM stripe_customer_accounts WHERE session_id = $1"#,
    )
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(account)
}

pub async fn delete_stripe_integrations(session_id: i64, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM stripe_connect_accounts WHERE session_id = $1").bind(session_id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM stripe_customer_accounts WHERE session_id = $1").bind(session_id).execute(conn).await?;
    Ok(())
}
