//! Tendermint indexer: decomposes each data item into a block record and a
//! block-results record.
//!
//! Tree shape per data item:
//!
//! ```text
//!            item leaf = SHA256(SHA256(key) || sub_root)
//!                                              |
//!                      sub_root = SHA256(H(block) || H(block_results))
//! ```
//!
//! Read-path proofs therefore carry the sibling inside the two-leaf sub
//! tree, then `{left: false, SHA256(key)}`, then the bundle-level proof.

use crate::errors::IndexingError;
use serde::Deserialize;
use serde_json::Value;
use trustless_merkle::{combine, compact_proof, encode_proof_base64, hash_json, hash_key, merkle_root};
use trustless_types::{
    rpc, Bindings, Bundle, Endpoint, Index, IndexId, MerkleNode, ParameterSet, TrustlessRecord,
};

/// The decoded value of a tendermint data item.
#[derive(Debug, Deserialize)]
struct TendermintValue {
    /// The `/block` RPC result, including `block_id`.
    block: Value,
    /// The `/block_results` RPC result.
    block_results: Value,
}

/// Indexes tendermint blocks by height and hash, and block results by
/// height.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TendermintIndexer;

impl TendermintIndexer {
    /// Block and block-results paths.
    pub fn bindings(&self) -> Bindings {
        vec![
            (
                "/block",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::TendermintBlock,
                        &["height"],
                        &["height of the block"],
                    )],
                    schema: "TendermintBlock",
                },
            ),
            (
                "/block_by_hash",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::TendermintBlockByHash,
                        &["hash"],
                        &["hash of the block"],
                    )],
                    schema: "TendermintBlock",
                },
            ),
            (
                "/block_results",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::TendermintBlockResults,
                        &["height"],
                        &["height of the block"],
                    )],
                    schema: "TendermintBlockResults",
                },
            ),
        ]
    }

    /// Emits two records per data item, both wrapped as JSON-RPC results.
    pub fn index_bundle(
        &self,
        bundle: &Bundle,
        exclude_proof: bool,
    ) -> Result<Vec<TrustlessRecord>, IndexingError> {
        let mut values = Vec::with_capacity(bundle.data_items.len());
        let mut leaves = Vec::with_capacity(bundle.data_items.len());

        for item in &bundle.data_items {
            let value: TendermintValue = serde_json::from_value(item.value.clone())
                .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?;

            let block_hash = hash_json(&value.block)?;
            let results_hash = hash_json(&value.block_results)?;
            let sub_root = merkle_root(&[block_hash, results_hash])?;
            leaves.push(combine(&hash_key(&item.key), &sub_root));
            values.push((block_hash, results_hash, value));
        }

        let mut records = Vec::with_capacity(bundle.data_items.len() * 2);
        for (index, item) in bundle.data_items.iter().enumerate() {
            let (block_hash, results_hash, value) = &values[index];
            let bundle_nodes = compact_proof(&leaves, index)?;

            let block_id_hash = value
                .block
                .get("block_id")
                .and_then(|id| id.get("hash"))
                .and_then(Value::as_str)
                .ok_or_else(|| IndexingError::MissingField {
                    key: item.key.clone(),
                    field: "block.block_id.hash",
                })?;

            let block_proof = self.encode(
                bundle,
                MerkleNode::new(true, *results_hash),
                &item.key,
                &bundle_nodes,
                exclude_proof,
            )?;
            records.push(TrustlessRecord {
                value: rpc::wrap_result(&value.block),
                proof: block_proof,
                pool_id: bundle.pool_id,
                bundle_id: bundle.bundle_id,
                chain_id: bundle.chain_id.clone(),
                indices: vec![
                    Index::new(IndexId::TendermintBlock, item.key.clone()),
                    Index::new(IndexId::TendermintBlockByHash, block_id_hash.to_string()),
                ],
            });

            let results_proof = self.encode(
                bundle,
                MerkleNode::new(false, *block_hash),
                &item.key,
                &bundle_nodes,
                exclude_proof,
            )?;
            records.push(TrustlessRecord {
                value: rpc::wrap_result(&value.block_results),
                proof: results_proof,
                pool_id: bundle.pool_id,
                bundle_id: bundle.bundle_id,
                chain_id: bundle.chain_id.clone(),
                indices: vec![Index::new(IndexId::TendermintBlockResults, item.key.clone())],
            });
        }

        Ok(records)
    }

    /// Assembles sub-tree sibling + key hash + bundle proof and encodes it.
    fn encode(
        &self,
        bundle: &Bundle,
        sibling: MerkleNode,
        key: &str,
        bundle_nodes: &[MerkleNode],
        exclude_proof: bool,
    ) -> Result<String, IndexingError> {
        if exclude_proof {
            return Ok(String::new());
        }
        let mut nodes = vec![sibling, MerkleNode::new(false, hash_key(key))];
        nodes.extend_from_slice(bundle_nodes);
        Ok(encode_proof_base64(
            bundle.pool_id,
            bundle.bundle_id,
            &bundle.chain_id,
            "",
            "result",
            &nodes,
        )?)
    }
}
