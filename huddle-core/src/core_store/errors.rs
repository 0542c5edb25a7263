/*
    errors.rs - Error types for the store subsystem

    Defines all error types that can occur in:
    - SQLite queries and transactions
    - Connection pool checkout
    - Schema migrations and rollbacks
    - Decoding persisted rows back into models
*/

use thiserror::Error;

/// Errors that can occur in the store subsystem
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query or transaction failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No connection could be checked out of the pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A schema migration cannot be applied or reverted
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted row does not decode into a valid model
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl StoreError {
    pub fn corrupted(msg: impl Into<String>) -> Self {
        StoreError::CorruptedData(msg.into())
    }
}
