use crate::types::EntryId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Invalid link: {reason}")]
    InvalidLink { reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl KbError {
    /// True for failures of the underlying store (the repository error class).
    /// Callers running bulk operations use this to decide whether a per-entry
    /// failure is worth retrying.
    pub fn is_repository(&self) -> bool {
        matches!(
            self,
            KbError::Storage(_)
                | KbError::Database(_)
                | KbError::Table(_)
                | KbError::Transaction(_)
                | KbError::Commit(_)
                | KbError::StorageOperation(_)
                | KbError::Serialization(_)
        )
    }
}
