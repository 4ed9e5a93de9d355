use common::{BatchId, InvoiceLineId};
use thiserror::Error;

/// Errors that can occur when talking to the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A guarded stock decrement found less on hand than requested.
    #[error("Insufficient stock for batch {batch_id}: requested {requested}, available {available}")]
    InsufficientStock {
        batch_id: BatchId,
        requested: u32,
        available: u32,
    },

    /// A guarded refund line would return more units than remain on the sale.
    #[error("Refund of {requested} exceeds what remains on line {line_id}: only {remaining} left")]
    RefundLimitExceeded {
        line_id: InvoiceLineId,
        requested: u32,
        remaining: u32,
    },

    /// A backend row could not be mapped onto a typed record.
    #[error("Malformed {entity} record: {reason}")]
    MalformedRecord { entity: &'static str, reason: String },

    /// The backend could not be reached.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn malformed(entity: &'static str, reason: impl Into<String>) -> Self {
        StoreError::MalformedRecord {
            entity,
            reason: reason.into(),
        }
    }

    /// Returns true when the failure is about reachability rather than data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
