use sqlx::SqliteConnection;

use crate::db::sqlite::DatabaseError;

pub async fn has_processed(event_id: &str, conn: &mut SqliteConnection) -> Result<bool, DatabaseError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT event_id FROM processed_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

pub async fn mark_processed(event_id: &str, topic: &str, conn: &mut SqliteConnection) -> Result<(), DatabaseError> {
    sqlx::query("INSERT OR IGNORE INTO processed_events (event_id, topic) VALUES ($1, $2)")
        .bind(event_id)
        .bind(topic)
        .execute(conn)
        .await?;
    Ok(())
}
