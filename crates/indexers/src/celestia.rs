//! Celestia indexer: serves whole blocks of shares by height and individual
//! namespace slices by `<height>-<namespace>`.
//!
//! Tree shape per data item:
//!
//! ```text
//!          item leaf = SHA256(SHA256(key) || ns_root)
//!                                            |
//!          ns_root = merkle root over H(sharesByNamespace[i])
//! ```
//!
//! A namespace proof is its compact path inside the namespace sub-tree,
//! then `{left: false, SHA256(key)}`, then the bundle-level proof.

use crate::errors::IndexingError;
use serde::Deserialize;
use serde_json::Value;
use trustless_merkle::{combine, compact_proof, encode_proof_base64, hash_json, hash_key, merkle_root};
use trustless_types::{
    rpc, Bindings, Bundle, Endpoint, Index, IndexId, MerkleNode, ParameterSet, TrustlessRecord,
};

/// The decoded value of a celestia data item.
#[derive(Debug, Deserialize)]
struct CelestiaValue {
    /// Shares grouped by namespace.
    #[serde(rename = "sharesByNamespace", default)]
    shares_by_namespace: Vec<NamespacedShares>,
}

/// One namespace's shares; hashed as a whole to form a sub-tree leaf.
#[derive(Debug, Deserialize, serde::Serialize)]
struct NamespacedShares {
    /// The namespace id.
    #[serde(default)]
    namespace_id: String,
    /// The raw shares.
    #[serde(default)]
    data: Vec<Value>,
}

/// Indexes celestia shares by height and by `<height>-<namespace>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CelestiaIndexer;

impl CelestiaIndexer {
    /// Whole-block and per-namespace paths.
    pub fn bindings(&self) -> Bindings {
        vec![
            (
                "/GetShares",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::BlockHeight,
                        &["height"],
                        &["height of the block"],
                    )],
                    schema: "JsonRPC",
                },
            ),
            (
                "/GetSharesByNamespace",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::SharesByNamespace,
                        &["height", "namespace"],
                        &["height of the block", "namespace id of the shares"],
                    )],
                    schema: "JsonRPC",
                },
            ),
        ]
    }

    /// Emits one whole-item record plus one record per namespace.
    pub fn index_bundle(
        &self,
        bundle: &Bundle,
        exclude_proof: bool,
    ) -> Result<Vec<TrustlessRecord>, IndexingError> {
        let mut values = Vec::with_capacity(bundle.data_items.len());
        let mut leaves = Vec::with_capacity(bundle.data_items.len());

        for item in &bundle.data_items {
            let value: CelestiaValue = serde_json::from_value(item.value.clone())
                .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?;

            let ns_leaves = value
                .shares_by_namespace
                .iter()
                .map(hash_json)
                .collect::<Result<Vec<_>, _>>()?;
            let ns_root = merkle_root(&ns_leaves)?;
            leaves.push(combine(&hash_key(&item.key), &ns_root));
            values.push((ns_leaves, value));
        }

        let mut records = Vec::new();
        for (index, item) in bundle.data_items.iter().enumerate() {
            let (ns_leaves, value) = &values[index];
            let bundle_nodes = compact_proof(&leaves, index)?;

            let item_proof = if exclude_proof {
                String::new()
            } else {
                encode_proof_base64(
                    bundle.pool_id,
                    bundle.bundle_id,
                    &bundle.chain_id,
                    &item.key,
                    "result",
                    &bundle_nodes,
                )?
            };
            records.push(TrustlessRecord {
                value: rpc::wrap_result(&serde_json::to_value(item).map_err(|source| {
                    IndexingError::ItemDecode { key: item.key.clone(), source }
                })?),
                proof: item_proof,
                pool_id: bundle.pool_id,
                bundle_id: bundle.bundle_id,
                chain_id: bundle.chain_id.clone(),
                indices: vec![Index::new(IndexId::BlockHeight, item.key.clone())],
            });

            for (ns_index, namespace) in value.shares_by_namespace.iter().enumerate() {
                let proof = if exclude_proof {
                    String::new()
                } else {
                    let mut nodes = compact_proof(ns_leaves, ns_index)?;
                    nodes.push(MerkleNode::new(false, hash_key(&item.key)));
                    nodes.extend_from_slice(&bundle_nodes);
                    encode_proof_base64(
                        bundle.pool_id,
                        bundle.bundle_id,
                        &bundle.chain_id,
                        "",
                        "result",
                        &nodes,
                    )?
                };

                records.push(TrustlessRecord {
                    value: rpc::wrap_result(&serde_json::to_value(namespace).map_err(
                        |source| IndexingError::ItemDecode { key: item.key.clone(), source },
                    )?),
                    proof,
                    pool_id: bundle.pool_id,
                    bundle_id: bundle.bundle_id,
                    chain_id: bundle.chain_id.clone(),
                    indices: vec![Index::new(
                        IndexId::SharesByNamespace,
                        format!("{}-{}", item.key, namespace.namespace_id),
                    )],
                });
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustless_merkle::{decode_proof_base64, verify_compact};
    use trustless_types::DataItem;

    fn bundle() -> Bundle {
        Bundle {
            pool_id: 3,
            bundle_id: 5,
            chain_id: "kyve-1".to_string(),
            data_items: vec![DataItem {
                key: "500".to_string(),
                value: json!({
                    "sharesByNamespace": [
                        { "namespace_id": "NS_A", "data": ["c2hhcmUx"] },
                        { "namespace_id": "NS_B", "data": ["c2hhcmUy"] },
                    ],
                }),
            }],
        }
    }

    #[test]
    fn test_records_per_item_and_namespace() {
        let records = CelestiaIndexer.index_bundle(&bundle(), false).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].indices, vec![Index::new(IndexId::BlockHeight, "500".to_string())]);
        assert_eq!(
            records[1].indices,
            vec![Index::new(IndexId::SharesByNamespace, "500-NS_A".to_string())]
        );
        assert_eq!(
            records[2].indices,
            vec![Index::new(IndexId::SharesByNamespace, "500-NS_B".to_string())]
        );
        assert_eq!(records[1].value["result"]["namespace_id"], "NS_A");
    }

    #[test]
    fn test_namespace_proof_spans_both_trees() {
        let bundle = bundle();
        let records = CelestiaIndexer.index_bundle(&bundle, false).unwrap();

        let shares = bundle.data_items[0].value["sharesByNamespace"].as_array().unwrap();
        let ns_leaves: Vec<_> = shares.iter().map(|entry| hash_json(entry).unwrap()).collect();
        let ns_root = merkle_root(&ns_leaves).unwrap();
        let root = combine(&hash_key("500"), &ns_root);

        // Two namespaces -> one sub-tree sibling, one key hash node, and an
        // empty bundle proof for the single-item bundle.
        let decoded = decode_proof_base64(&records[1].proof).unwrap();
        assert_eq!(decoded.proof.len(), 2);
        assert!(verify_compact(ns_leaves[0], &decoded.proof, root).unwrap());

        let decoded = decode_proof_base64(&records[2].proof).unwrap();
        assert!(verify_compact(ns_leaves[1], &decoded.proof, root).unwrap());
    }

    #[test]
    fn test_whole_item_record_carries_bundle_proof_only() {
        let records = CelestiaIndexer.index_bundle(&bundle(), false).unwrap();
        let decoded = decode_proof_base64(&records[0].proof).unwrap();
        assert_eq!(decoded.data_item_key, "500");
        assert!(decoded.proof.is_empty());
    }

    #[test]
    fn test_item_without_namespaces_is_rejected() {
        let mut bundle = bundle();
        bundle.data_items[0].value = json!({ "sharesByNamespace": [] });
        assert!(CelestiaIndexer.index_bundle(&bundle, false).is_err());
    }
}
