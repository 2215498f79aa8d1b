//! Error types for tree construction and proof encoding.

use thiserror::Error;

/// Errors raised while constructing trees or compact proofs.
#[derive(Error, Debug)]
pub enum MerkleError {
    /// A tree cannot be built from zero leaves.
    #[error("failed to create tree: empty input")]
    EmptyTree,
    /// The requested leaf is not inside the tree.
    #[error("leaf index {index} out of bounds for {leaves} leaves")]
    LeafIndexOutOfBounds {
        /// The requested leaf index.
        index: usize,
        /// The number of leaves in the tree.
        leaves: usize,
    },
    /// A proof node carried a hash that is not 32 hex encoded bytes.
    #[error("invalid sibling hash in proof node: {0}")]
    InvalidSiblingHash(String),
    /// The leaf value could not be serialised to canonical JSON.
    #[error("failed to serialize leaf: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by the proof wire codec.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProofCodecError {
    /// The encoder only writes, and the decoder only accepts, version 1.
    #[error("unsupported proof version {0}")]
    UnsupportedVersion(u8),
    /// The input ended before a fixed-size field was complete.
    #[error("truncated proof: {0}")]
    Truncated(&'static str),
    /// A string field was not null-terminated.
    #[error("unterminated string field: {0}")]
    UnterminatedString(&'static str),
    /// A string field contained an interior null byte on encode.
    #[error("string field contains a null byte: {0}")]
    EmbeddedNull(&'static str),
    /// The trailing merkle node records did not divide evenly.
    #[error("trailing partial merkle node record")]
    PartialNode,
    /// A string field was not valid UTF-8.
    #[error("string field is not valid utf-8: {0}")]
    InvalidUtf8(&'static str),
    /// A node hash was not valid hex on encode.
    #[error("invalid node hash: {0}")]
    InvalidNodeHash(String),
    /// The base64 envelope could not be decoded.
    #[error("invalid base64 proof: {0}")]
    InvalidBase64(String),
}
