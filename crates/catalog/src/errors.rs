//! Error type for catalog operations.

use thiserror::Error;
use trustless_indexers::IndexingError;
use trustless_storage::StorageError;

/// Errors raised by the catalog adapter.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No record is registered under the queried index.
    #[error("record not found")]
    NotFound,
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The pool's indexer rejected the bundle.
    #[error(transparent)]
    Indexing(#[from] IndexingError),
    /// An object-store write or read failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A storage worker task died.
    #[error("storage worker failed: {0}")]
    Worker(String),
    /// A stored row carried an unknown file type code.
    #[error("invalid file type code {0}")]
    InvalidFileType(i64),
    /// A stored payload failed to decode back into a record.
    #[error("failed to decode stored record: {0}")]
    Decode(#[from] serde_json::Error),
}
