//! Beacon blob sidecar indexer: one record per data item with a dual
//! height/slot index.

use crate::errors::IndexingError;
use serde::Deserialize;
use trustless_merkle::{compact_proof, encode_proof_base64, hash_json};
use trustless_types::{Bindings, Bundle, Endpoint, Index, IndexId, ParameterSet, TrustlessRecord};

/// The slice of the blob value this indexer reads.
#[derive(Debug, Deserialize)]
struct BlobValue {
    /// The beacon slot the sidecars were included in.
    #[serde(default)]
    slot: u64,
}

/// Indexes blob sidecar items under both the execution block height (the
/// item key) and the beacon slot number (from the value).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EthereumBlobsIndexer;

impl EthereumBlobsIndexer {
    /// One path with two alternative parameter sets.
    pub fn bindings(&self) -> Bindings {
        vec![(
            "/beacon/blob_sidecars",
            Endpoint {
                parameter_sets: vec![
                    ParameterSet::new(
                        IndexId::BlockHeight,
                        &["block_height"],
                        &["height of the corresponding execution block"],
                    ),
                    ParameterSet::new(
                        IndexId::SlotNumber,
                        &["slot_number"],
                        &["slot of the beacon block"],
                    ),
                ],
                schema: "DataItem",
            },
        )]
    }

    /// Emits one record per data item carrying the raw item, the plain
    /// bundle proof and both indices.
    pub fn index_bundle(
        &self,
        bundle: &Bundle,
        exclude_proof: bool,
    ) -> Result<Vec<TrustlessRecord>, IndexingError> {
        let leaves = bundle
            .data_items
            .iter()
            .map(hash_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(bundle.data_items.len());
        for (index, item) in bundle.data_items.iter().enumerate() {
            let blob: BlobValue = serde_json::from_value(item.value.clone())
                .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?;

            let proof = if exclude_proof {
                String::new()
            } else {
                let nodes = compact_proof(&leaves, index)?;
                encode_proof_base64(
                    bundle.pool_id,
                    bundle.bundle_id,
                    &bundle.chain_id,
                    &item.key,
                    "",
                    &nodes,
                )?
            };

            records.push(TrustlessRecord {
                value: serde_json::to_value(item)
                    .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?,
                proof,
                pool_id: bundle.pool_id,
                bundle_id: bundle.bundle_id,
                chain_id: bundle.chain_id.clone(),
                indices: vec![
                    Index::new(IndexId::BlockHeight, item.key.clone()),
                    Index::new(IndexId::SlotNumber, blob.slot.to_string()),
                ],
            });
        }

        Ok(records)
    }
}
