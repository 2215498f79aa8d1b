//! Error type shared by the object store drivers.

use thiserror::Error;

/// Errors raised while writing or reading record payloads.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The record payload failed to serialise.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An S3 request failed.
    #[error("s3 request failed: {0}")]
    S3(String),
}
