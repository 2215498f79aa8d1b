//! Bundle metadata and payload source with mirror failover.

use crate::{errors::SourceError, fetch::Fetcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use trustless_types::{
    FinalizedBundle, FinalizedBundleResponse, FinalizedBundlesResponse, PoolInfo, PoolResponse,
};

/// Page size used by the finalized bundle listing.
pub const BUNDLES_PAGE_LIMIT: u32 = 100;

/// The configured upstream mirrors, ordered by priority.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Storage provider id to payload mirror urls.
    #[serde(default)]
    pub storage: HashMap<u32, Vec<String>>,
    /// Chain id to REST mirror urls.
    #[serde(default)]
    pub chains: HashMap<String, Vec<String>>,
}

/// Fetches finalized bundle metadata and payloads, iterating through the
/// configured mirrors until one succeeds.
#[derive(Debug, Clone)]
pub struct BundleSource {
    endpoints: Endpoints,
    fetcher: Fetcher,
}

impl BundleSource {
    /// Creates a source over the given mirror configuration.
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints, fetcher: Fetcher::new() }
    }

    /// Replaces the fetch helper, mainly to shrink retry budgets in tests.
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Fetches the on-chain pool state.
    pub async fn get_pool_info(
        &self,
        chain_id: &str,
        pool_id: u16,
    ) -> Result<PoolInfo, SourceError> {
        let raw = self.get_from_chain(chain_id, &pool_info_path(pool_id)).await?;
        let response: PoolResponse = serde_json::from_slice(&raw)?;
        Ok(response.pool)
    }

    /// Fetches the metadata of one finalized bundle.
    pub async fn get_finalized_bundle(
        &self,
        chain_id: &str,
        pool_id: u16,
        bundle_id: u64,
    ) -> Result<FinalizedBundle, SourceError> {
        let raw = self.get_from_chain(chain_id, &finalized_bundle_path(pool_id, bundle_id)).await?;
        let response: FinalizedBundleResponse = serde_json::from_slice(&raw)?;
        Ok(response.finalized_bundle)
    }

    /// Fetches one page of the finalized bundle listing.
    pub async fn get_finalized_bundles(
        &self,
        chain_id: &str,
        pool_id: u16,
        pagination_key: Option<&str>,
    ) -> Result<FinalizedBundlesResponse, SourceError> {
        let path = finalized_bundles_path(pool_id, BUNDLES_PAGE_LIMIT, pagination_key);
        let raw = self.get_from_chain(chain_id, &path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Downloads the compressed payload of a bundle from its storage
    /// provider's mirrors.
    pub async fn fetch_payload(&self, bundle: &FinalizedBundle) -> Result<Vec<u8>, SourceError> {
        let provider = bundle
            .storage_provider()
            .ok_or(SourceError::InvalidMetadata("storage_provider_id"))?;
        let mirrors = self
            .endpoints
            .storage
            .get(&provider)
            .filter(|mirrors| !mirrors.is_empty())
            .ok_or_else(|| SourceError::UnknownStorageProvider(bundle.storage_provider_id.clone()))?;

        for mirror in mirrors {
            let url = format!("{}/{}", mirror.trim_end_matches('/'), bundle.storage_id);
            match self.fetcher.get_with_backoff(&url).await {
                Ok(data) => return Ok(data),
                Err(err) => {
                    warn!(target: "bundles", "mirror {mirror} failed for storage id {}: {err}", bundle.storage_id);
                }
            }
        }

        Err(SourceError::UpstreamUnavailable {
            context: format!("payload with storage id {}", bundle.storage_id),
        })
    }

    async fn get_from_chain(&self, chain_id: &str, path: &str) -> Result<Vec<u8>, SourceError> {
        let mirrors = self
            .endpoints
            .chains
            .get(chain_id)
            .filter(|mirrors| !mirrors.is_empty())
            .ok_or_else(|| SourceError::UnknownChain(chain_id.to_string()))?;

        for mirror in mirrors {
            let url = format!("{}{}", mirror.trim_end_matches('/'), path);
            match self.fetcher.get_with_backoff(&url).await {
                Ok(data) => return Ok(data),
                Err(err) => {
                    warn!(target: "bundles", "mirror {mirror} failed for {path}: {err}");
                }
            }
        }

        Err(SourceError::UpstreamUnavailable { context: format!("chain {chain_id} path {path}") })
    }
}

#[async_trait::async_trait]
impl crate::traits::BundleProvider for BundleSource {
    async fn get_pool_info(&self, chain_id: &str, pool_id: u16) -> Result<PoolInfo, SourceError> {
        Self::get_pool_info(self, chain_id, pool_id).await
    }

    async fn get_finalized_bundle(
        &self,
        chain_id: &str,
        pool_id: u16,
        bundle_id: u64,
    ) -> Result<FinalizedBundle, SourceError> {
        Self::get_finalized_bundle(self, chain_id, pool_id, bundle_id).await
    }

    async fn fetch_payload(&self, bundle: &FinalizedBundle) -> Result<Vec<u8>, SourceError> {
        Self::fetch_payload(self, bundle).await
    }
}

fn pool_info_path(pool_id: u16) -> String {
    format!("/kyve/query/v1beta1/pool/{pool_id}")
}

fn finalized_bundle_path(pool_id: u16, bundle_id: u64) -> String {
    format!("/kyve/v1/bundles/{pool_id}/{bundle_id}")
}

fn finalized_bundles_path(pool_id: u16, limit: u32, pagination_key: Option<&str>) -> String {
    match pagination_key {
        Some(key) => {
            format!("/kyve/v1/bundles/{pool_id}?pagination.limit={limit}&pagination.key={key}")
        }
        None => format!("/kyve/v1/bundles/{pool_id}?pagination.limit={limit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_without_mirrors() -> BundleSource {
        BundleSource::new(Endpoints::default())
    }

    #[test]
    fn test_upstream_paths() {
        assert_eq!(pool_info_path(21), "/kyve/query/v1beta1/pool/21");
        assert_eq!(finalized_bundle_path(21, 7), "/kyve/v1/bundles/21/7");
        assert_eq!(
            finalized_bundles_path(21, 100, None),
            "/kyve/v1/bundles/21?pagination.limit=100"
        );
        assert_eq!(
            finalized_bundles_path(21, 100, Some("abc")),
            "/kyve/v1/bundles/21?pagination.limit=100&pagination.key=abc"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_chain_is_rejected() {
        let err = source_without_mirrors().get_pool_info("kaon-1", 21).await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownChain(chain) if chain == "kaon-1"));
    }

    #[tokio::test]
    async fn test_unconfigured_storage_provider_is_rejected() {
        let bundle = FinalizedBundle {
            storage_provider_id: "9".to_string(),
            storage_id: "x".to_string(),
            ..Default::default()
        };
        let err = source_without_mirrors().fetch_payload(&bundle).await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownStorageProvider(id) if id == "9"));
    }

    #[tokio::test]
    async fn test_garbage_storage_provider_id_is_rejected() {
        let bundle =
            FinalizedBundle { storage_provider_id: "nope".to_string(), ..Default::default() };
        let err = source_without_mirrors().fetch_payload(&bundle).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidMetadata("storage_provider_id")));
    }
}
