//! Per-pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration of one served pool.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// The first bundle id this deployment is interested in.
    #[serde(default)]
    pub bundle_start_id: u64,
    /// The chain the pool lives on.
    pub chain_id: String,
    /// The indexer name resolving this pool's runtime.
    pub indexer: String,
    /// The on-chain pool id.
    pub pool_id: u16,
    /// The path prefix the pool is served under.
    pub slug: String,
    /// Whether records are stored and served without proofs.
    #[serde(default)]
    pub exclude_proof: bool,
}
