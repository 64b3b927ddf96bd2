//! Ledger error types.

use thiserror::Error;

/// Errors raised by ledger storage.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
