//! Upstream bundle shapes as returned by the chain REST endpoints.

use serde::{Deserialize, Serialize};

/// A single entry inside a decoded bundle payload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// The runtime key of the item (block height, slot, ...).
    pub key: String,
    /// The opaque runtime value.
    pub value: serde_json::Value,
}

/// A fully fetched, verified and decoded bundle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// The pool the bundle belongs to.
    pub pool_id: u16,
    /// The dense bundle id within the pool.
    pub bundle_id: u64,
    /// The chain the pool lives on.
    pub chain_id: String,
    /// The ordered data items of the bundle.
    pub data_items: Vec<DataItem>,
}

/// Metadata of a finalized bundle as attested on-chain.
///
/// All numeric fields arrive as strings on the wire; typed accessors parse
/// them on demand.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedBundle {
    /// The bundle id.
    #[serde(default)]
    pub id: String,
    /// The opaque handle of the payload at the storage provider.
    #[serde(default)]
    pub storage_id: String,
    /// The storage provider the payload was archived with.
    #[serde(default)]
    pub storage_provider_id: String,
    /// The compression applied to the payload.
    #[serde(default)]
    pub compression_id: String,
    /// The first data item key contained in the bundle.
    #[serde(default)]
    pub from_key: String,
    /// The last data item key contained in the bundle.
    #[serde(default)]
    pub to_key: String,
    /// Hex SHA-256 of the compressed payload.
    #[serde(default)]
    pub data_hash: String,
    /// Runtime-specific summary JSON, contains the bundle merkle root.
    #[serde(default)]
    pub bundle_summary: String,
}

impl FinalizedBundle {
    /// The bundle id as an integer.
    pub fn bundle_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    /// The storage provider id as an integer.
    pub fn storage_provider(&self) -> Option<u32> {
        self.storage_provider_id.parse().ok()
    }

    /// The compression id as an integer.
    pub fn compression(&self) -> Option<u32> {
        self.compression_id.parse().ok()
    }

    /// Parses the runtime-specific [BundleSummary] out of the metadata.
    pub fn summary(&self) -> Option<BundleSummary> {
        serde_json::from_str(&self.bundle_summary).ok()
    }
}

/// The parsed `bundle_summary` of a [FinalizedBundle].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    /// Hex merkle root over the bundle's data items.
    #[serde(default)]
    pub merkle_root: String,
}

/// Response shape of `/kyve/v1/bundles/<pool>/<bundle>`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedBundleResponse {
    /// The requested bundle.
    pub finalized_bundle: FinalizedBundle,
}

/// Cosmos-style pagination cursor.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Opaque key of the next page, absent on the last page.
    #[serde(default)]
    pub next_key: Option<String>,
}

/// Response shape of the paginated `/kyve/v1/bundles/<pool>` listing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedBundlesResponse {
    /// The bundles of the requested page.
    #[serde(default)]
    pub finalized_bundles: Vec<FinalizedBundle>,
    /// The pagination cursor.
    #[serde(default)]
    pub pagination: Pagination,
}

/// Response shape of `/kyve/query/v1beta1/pool/<pool>`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolResponse {
    /// The requested pool.
    pub pool: PoolInfo,
}

/// On-chain pool state.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// The pool id.
    #[serde(default)]
    pub id: u64,
    /// The mutable pool data.
    pub data: PoolData,
}

/// The data section of a [PoolInfo].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolData {
    /// The runtime producing this pool's bundles.
    #[serde(default)]
    pub runtime: String,
    /// The key the pool started archiving at.
    #[serde(default)]
    pub start_key: String,
    /// The most recent archived key.
    #[serde(default)]
    pub current_key: String,
    /// Total number of finalized bundles; bundle ids are dense in
    /// `[0, total_bundles)`.
    #[serde(default)]
    pub total_bundles: u64,
    /// Runtime-specific pool configuration.
    #[serde(default)]
    pub config: String,
}
