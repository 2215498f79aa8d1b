//! Error types for indexing, record lookup and interception.

use thiserror::Error;
use trustless_merkle::{MerkleError, ProofCodecError};

/// Errors raised while decomposing a bundle into records.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// A data item did not match the runtime's expected value shape.
    #[error("failed to decode data item {key}: {source}")]
    ItemDecode {
        /// The key of the offending item.
        key: String,
        /// The underlying decode error.
        source: serde_json::Error,
    },
    /// A data item is missing a field the indexer derives an index from.
    #[error("data item {key} is missing field {field}")]
    MissingField {
        /// The key of the offending item.
        key: String,
        /// The missing field.
        field: &'static str,
    },
    /// Tree construction failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    /// Proof encoding failed.
    #[error(transparent)]
    Proof(#[from] ProofCodecError),
}

/// Errors raised while resolving a stored record on the read path.
#[derive(Error, Debug)]
pub enum LookupError {
    /// No record is registered under the index.
    #[error("record not found")]
    NotFound,
    /// The catalog or object store failed while resolving the record.
    #[error("failed to resolve record: {0}")]
    Resolve(String),
}

/// Errors raised by a read-time interceptor.
#[derive(Error, Debug)]
pub enum InterceptError {
    /// The stored object does not contain the requested transaction.
    #[error("transaction not found")]
    TransactionNotFound,
    /// A required query parameter was absent.
    #[error("missing query parameter {0}")]
    BadQuery(&'static str),
    /// The underlying record lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// The stored intermediate structure failed to decode.
    #[error("failed to decode stored record: {0}")]
    Decode(#[from] serde_json::Error),
    /// Proof re-assembly failed.
    #[error(transparent)]
    Proof(#[from] ProofCodecError),
    /// Tree reconstruction failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
}
