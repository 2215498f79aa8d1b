//! The servable record unit and its storage handle.

use crate::index::Index;
use serde::{Deserialize, Serialize};

/// One node of a compact merkle inclusion proof.
///
/// `left: true` means the current hash is the left operand of the parent
/// combination (`parent = SHA256(current || hash)`); `left: false` means the
/// sibling prepends (`parent = SHA256(hash || current)`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    /// Whether the current hash is the left operand at this level.
    pub left: bool,
    /// Hex encoded SHA-256 sibling hash.
    pub hash: String,
}

impl MerkleNode {
    /// Creates a node from a raw sibling hash.
    pub fn new(left: bool, hash: [u8; 32]) -> Self {
        Self { left, hash: hex::encode(hash) }
    }
}

/// The unit the gateway serves: a response payload plus its inclusion proof
/// and the secondary indices it is registered under.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustlessRecord {
    /// The response body, already wrapped in the shape the target endpoint
    /// requires (JSON-RPC envelope or bare item).
    pub value: serde_json::Value,
    /// Base64 encoded proof wire format; empty when the proof is synthesised
    /// at read time. An empty proof is not serialised at all, which is also
    /// how proof stripping for `exclude_proof` pools works.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proof: String,
    /// The pool the record was derived from.
    pub pool_id: u16,
    /// The bundle the record was derived from.
    pub bundle_id: u64,
    /// The chain the pool lives on.
    pub chain_id: String,
    /// The secondary indices pointing at this record. Never serialised into
    /// the stored payload; the catalog tracks them relationally.
    #[serde(skip)]
    pub indices: Vec<Index>,
}

impl TrustlessRecord {
    /// The deterministic object-store name of the record: the concatenation
    /// of `<value>-<index_id>` over all indices in insertion order.
    pub fn unique_name(&self) -> String {
        self.indices
            .iter()
            .map(|index| format!("{}-{}", index.value, index.index_id.code()))
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Storage backend of a saved record payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Payload lives on the local filesystem.
    #[default]
    Local,
    /// Payload lives in an S3 compatible bucket.
    S3,
}

impl FileType {
    /// The stable integer code persisted in the catalog.
    pub const fn code(&self) -> i64 {
        match self {
            Self::Local => 0,
            Self::S3 => 1,
        }
    }

    /// Decodes a catalog code back into a file type.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Local),
            1 => Some(Self::S3),
            _ => None,
        }
    }
}

/// Handle of a record payload inside the object store.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    /// The backend the payload was written to.
    pub file_type: FileType,
    /// The unique path of the payload inside that backend.
    pub path: String,
}
