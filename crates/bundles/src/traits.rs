//! The upstream seam consumed by the crawler.

use crate::errors::SourceError;
use async_trait::async_trait;
use trustless_types::{FinalizedBundle, PoolInfo};

/// Serves finalized bundle metadata and payloads.
///
/// [crate::BundleSource] is the online implementation; tests substitute
/// seeded providers.
#[async_trait]
pub trait BundleProvider: Send + Sync {
    /// Fetches the on-chain pool state.
    async fn get_pool_info(&self, chain_id: &str, pool_id: u16) -> Result<PoolInfo, SourceError>;

    /// Fetches the metadata of one finalized bundle.
    async fn get_finalized_bundle(
        &self,
        chain_id: &str,
        pool_id: u16,
        bundle_id: u64,
    ) -> Result<FinalizedBundle, SourceError>;

    /// Downloads the compressed payload of a bundle.
    async fn fetch_payload(&self, bundle: &FinalizedBundle) -> Result<Vec<u8>, SourceError>;
}
