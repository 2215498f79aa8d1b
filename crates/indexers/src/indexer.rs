//! The [Indexer] dispatch enumeration and the read-path seams.

use crate::{
    celestia::CelestiaIndexer,
    errors::{IndexingError, InterceptError, LookupError},
    ethereum_blobs::EthereumBlobsIndexer,
    evm::EvmIndexer,
    height::HeightIndexer,
    tendermint::TendermintIndexer,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use trustless_types::{rpc, Bindings, Bundle, IndexId, TrustlessRecord};

/// Resolves an `(index_id, value)` pair into the stored record it points at.
///
/// Implemented by the catalog adapter; interceptors receive it as their only
/// window into storage.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Looks up and materialises the record registered under the index.
    async fn lookup(&self, index_id: IndexId, value: &str) -> Result<TrustlessRecord, LookupError>;
}

/// A response synthesised by an interceptor instead of the stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interception {
    /// The response body to serve.
    pub data: Value,
    /// Base64 encoded proof for the synthesised body.
    pub proof: String,
}

/// The per-runtime indexer family.
///
/// Each variant is a value type owning only its configuration; dispatch is a
/// plain match instead of trait objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indexer {
    /// Identity indexer keyed by block height.
    Height(HeightIndexer),
    /// Beacon blob sidecars, doubly indexed by execution height and slot.
    EthereumBlobs(EthereumBlobsIndexer),
    /// Tendermint blocks and block results.
    Tendermint(TendermintIndexer),
    /// Celestia namespaced shares.
    Celestia(CelestiaIndexer),
    /// EVM blocks, transactions and receipts with read-time proofs.
    Evm(EvmIndexer),
}

impl Indexer {
    /// Resolves an indexer from its config name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "height" => Some(Self::Height(HeightIndexer)),
            "ethereum-blobs" => Some(Self::EthereumBlobs(EthereumBlobsIndexer)),
            "tendermint" => Some(Self::Tendermint(TendermintIndexer)),
            "celestia" => Some(Self::Celestia(CelestiaIndexer)),
            "evm" => Some(Self::Evm(EvmIndexer)),
            _ => None,
        }
    }

    /// The config name of the indexer.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Height(_) => "height",
            Self::EthereumBlobs(_) => "ethereum-blobs",
            Self::Tendermint(_) => "tendermint",
            Self::Celestia(_) => "celestia",
            Self::Evm(_) => "evm",
        }
    }

    /// The HTTP paths and parameter sets this indexer serves.
    pub fn bindings(&self) -> Bindings {
        match self {
            Self::Height(indexer) => indexer.bindings(),
            Self::EthereumBlobs(indexer) => indexer.bindings(),
            Self::Tendermint(indexer) => indexer.bindings(),
            Self::Celestia(indexer) => indexer.bindings(),
            Self::Evm(indexer) => indexer.bindings(),
        }
    }

    /// Decomposes a bundle into trustless records. With `exclude_proof` set
    /// the records carry empty proofs.
    pub fn index_bundle(
        &self,
        bundle: &Bundle,
        exclude_proof: bool,
    ) -> Result<Vec<TrustlessRecord>, IndexingError> {
        match self {
            Self::Height(indexer) => indexer.index_bundle(bundle, exclude_proof),
            Self::EthereumBlobs(indexer) => indexer.index_bundle(bundle, exclude_proof),
            Self::Tendermint(indexer) => indexer.index_bundle(bundle, exclude_proof),
            Self::Celestia(indexer) => indexer.index_bundle(bundle, exclude_proof),
            Self::Evm(indexer) => indexer.index_bundle(bundle, exclude_proof),
        }
    }

    /// Gives the indexer a chance to synthesise the response from a stored
    /// intermediate record. Indexers without interception return `None` and
    /// the server falls back to the plain catalog lookup.
    pub async fn intercept(
        &self,
        lookup: &dyn RecordLookup,
        index_id: IndexId,
        params: &HashMap<String, String>,
    ) -> Result<Option<Interception>, InterceptError> {
        match self {
            Self::Evm(indexer) => indexer.intercept(lookup, index_id, params).await,
            _ => Ok(None),
        }
    }

    /// Builds the indexer's error response body.
    pub fn error_response(&self, message: &str, data: Value) -> Value {
        match self {
            Self::Height(_) | Self::EthereumBlobs(_) => serde_json::json!({
                "error": message,
                "message": data,
            }),
            Self::Tendermint(_) | Self::Celestia(_) | Self::Evm(_) => {
                rpc::wrap_error(message, data)
            }
        }
    }
}
