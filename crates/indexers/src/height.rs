//! Identity indexer: one record per data item, keyed by block height.

use crate::errors::IndexingError;
use trustless_merkle::{compact_proof, encode_proof_base64, hash_json};
use trustless_types::{Bindings, Bundle, Endpoint, Index, IndexId, ParameterSet, TrustlessRecord};

/// The identity indexer. The bundle tree is the only tree: one leaf per data
/// item, hashed from its canonical JSON.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeightIndexer;

impl HeightIndexer {
    /// One path, one parameter set.
    pub fn bindings(&self) -> Bindings {
        vec![(
            "/value",
            Endpoint {
                parameter_sets: vec![ParameterSet::new(
                    IndexId::BlockHeight,
                    &["height"],
                    &["height of the block"],
                )],
                schema: "DataItem",
            },
        )]
    }

    /// Emits one record per data item carrying the raw item and the plain
    /// bundle proof.
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
                indices: vec![Index::new(IndexId::BlockHeight, item.key.clone())],
            });
        }

        Ok(records)
    }
}
