use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl DatabaseError {
    /// Whether the error is a UNIQUE or PRIMARY KEY constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::DriverError(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}
