mod db;
mod errors;

pub mod catalog;
pub mod fulfillments;
pub mod orders;
pub mod payments;
pub mod processed_events;
pub mod sessions;

use std::{env, str::FromStr};

pub use db::SqliteDatabase;
pub use errors::DatabaseError;
use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/synqsell.db";

pub fn db_url() -> String {
    let result = env::var("SYNQ_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ SYNQ_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
