// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Storage error type
#[derive(Error, Debug, Diagnostic)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {message}")]
    #[diagnostic(
        code(storage::database_error),
        help("Check database logs and ensure the data directory is accessible and not corrupted")
    )]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    #[diagnostic(
        code(storage::transaction_error),
        help("Ensure the transaction is not already committed or aborted")
    )]
    TransactionError {
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(storage::serialization_error),
        help("The stored record does not match the expected schema")
    )]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A queue cursor points at a slot with no item
    #[error("Queue {queue} has no item at slot {slot}")]
    #[diagnostic(
        code(storage::queue_corrupted),
        help("The queue cursors and items tables disagree; restore the database from a backup")
    )]
    QueueCorrupted {
        queue: String,
        slot: u64,
    },
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Create a DatabaseError
    pub fn database_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source,
        }
    }

    /// Create a TransactionError
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }

    /// Create a QueueCorrupted error
    pub fn queue_corrupted(queue: impl Into<String>, slot: u64) -> Self {
        Self::QueueCorrupted {
            queue: queue.into(),
            slot,
        }
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::database_error(format!("Failed to open database: {}", err), Some(Box::new(err)))
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::transaction_error(format!("Transaction error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::database_error(format!("Storage error: {}", err), Some(Box::new(err)))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::database_error(format!("Table error: {}", err), Some(Box::new(err)))
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::transaction_error(format!("Commit error: {}", err))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization_error(format!("JSON error: {}", err), Some(Box::new(err)))
    }
}
