//! Secondary index descriptors used to route queries to stored records.

use serde::{Deserialize, Serialize};

/// The logical key spaces supported by the indexer family.
///
/// The discriminants are persisted in the catalog and embedded in routing
/// tables; they must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum IndexId {
    /// Lookup by block height.
    BlockHeight = 0,
    /// Lookup by beacon slot number.
    SlotNumber = 1,
    /// Lookup by `<height>-<namespace>` compound key.
    SharesByNamespace = 3,
    /// Lookup of a tendermint block by height.
    TendermintBlock = 4,
    /// Lookup of tendermint block results by height.
    TendermintBlockResults = 5,
    /// Lookup of a tendermint block by its hash.
    TendermintBlockByHash = 6,
    /// Lookup of an EVM block by its hash.
    EvmBlock = 7,
    /// Lookup of an EVM transaction by its hash.
    EvmTransaction = 8,
    /// Lookup of an EVM block's receipts by the block hash.
    EvmReceipts = 9,
}

impl IndexId {
    /// The stable integer code persisted in the catalog.
    pub const fn code(&self) -> i64 {
        *self as i64
    }
}

/// A single `(index_id, value)` pair attached to a record.
///
/// Compound keys join their string components with `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// The key space of the index.
    pub index_id: IndexId,
    /// The lookup value within that key space.
    pub value: String,
}

impl Index {
    /// Creates a new index entry.
    pub const fn new(index_id: IndexId, value: String) -> Self {
        Self { index_id, value }
    }
}
