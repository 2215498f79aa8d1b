//! EVM indexer: one stored object per data item serves block, transaction
//! and receipt queries, with proofs assembled at read time.
//!
//! Tree shape per data item:
//!
//! ```text
//! item leaf = SHA256(SHA256(key) || sub_root)
//! sub_root  = SHA256(raw_value_hash || block_receipts_root)
//! block_receipts_root = SHA256(block_root || receipts_logs_root)
//! block_root          = SHA256(H(block) || tx_root)
//! receipts_logs_root  = SHA256(H(receipts) || logs_root)
//! tx_root   = merkle root over H(tx) for each transaction
//! logs_root = merkle root over H(log) for all receipt logs, flattened
//! ```
//!
//! Because one stored object answers many queries, records are written with
//! an empty proof; [EvmIndexer::intercept] rebuilds the compact path for the
//! requested element by prepending the per-element proof to the stored
//! sub-tree and bundle proofs.

use crate::{
    errors::{IndexingError, InterceptError},
    indexer::{Interception, RecordLookup},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trustless_merkle::{
    combine, compact_proof, encode_proof_base64, hash_json, hash_key, merkle_root, MerkleError,
};
use trustless_types::{
    rpc, Bindings, Bundle, Endpoint, Index, IndexId, MerkleNode, ParameterSet, TrustlessRecord,
};

/// The decoded value of an EVM data item.
#[derive(Debug, Deserialize)]
struct EvmValue {
    /// The full block, transactions included.
    block: Value,
    /// The block's receipts.
    #[serde(default)]
    receipts: Vec<Value>,
}

/// The intermediate structure persisted for every data item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBlock {
    /// The full block.
    block: Value,
    /// The block's receipts.
    receipts: Vec<Value>,
    /// Sub-tree path from `H(block)` up to the item leaf.
    block_proof: Vec<MerkleNode>,
    /// Sub-tree path from `tx_root` up to the item leaf.
    transactions_proof: Vec<MerkleNode>,
    /// Sub-tree path from `H(receipts)` up to the item leaf.
    receipts_proof: Vec<MerkleNode>,
    /// Bundle-level path from the item leaf to the bundle root.
    bundle_proof: Vec<MerkleNode>,
}

/// Indexes EVM blocks by hash and their transactions and receipts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvmIndexer;

impl EvmIndexer {
    /// Block, transaction and receipts paths.
    pub fn bindings(&self) -> Bindings {
        vec![
            (
                "/blockByHash",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::EvmBlock,
                        &["hash"],
                        &["hash of a block"],
                    )],
                    schema: "EVMBlock",
                },
            ),
            (
                "/transactionByHash",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::EvmTransaction,
                        &["hash"],
                        &["hash of a transaction"],
                    )],
                    schema: "EVMTransaction",
                },
            ),
            (
                "/blockReceipts",
                Endpoint {
                    parameter_sets: vec![ParameterSet::new(
                        IndexId::EvmReceipts,
                        &["hash"],
                        &["hash of a block"],
                    )],
                    schema: "EVMBlockReceipts",
                },
            ),
        ]
    }

    /// Emits one record per data item carrying the intermediate structure.
    /// The record proof stays empty regardless of `exclude_proof`; proofs
    /// for this runtime only exist on the read path.
    pub fn index_bundle(
        &self,
        bundle: &Bundle,
        _exclude_proof: bool,
    ) -> Result<Vec<TrustlessRecord>, IndexingError> {
        let mut processed = Vec::with_capacity(bundle.data_items.len());
        let mut leaves = Vec::with_capacity(bundle.data_items.len());

        for item in &bundle.data_items {
            let value: EvmValue = serde_json::from_value(item.value.clone())
                .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?;

            let transactions = value
                .block
                .get("transactions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let logs = value
                .receipts
                .iter()
                .flat_map(|receipt| {
                    receipt.get("logs").and_then(Value::as_array).cloned().unwrap_or_default()
                })
                .collect::<Vec<_>>();

            let raw_value_hash = hash_json(&item.value)?;
            let block_hash = hash_json(&value.block)?;
            let tx_root = root_or_zero(&hash_all(&transactions)?);
            let receipts_hash = hash_json(&value.receipts)?;
            let logs_root = root_or_zero(&hash_all(&logs)?);

            let block_root = combine(&block_hash, &tx_root);
            let receipts_logs_root = combine(&receipts_hash, &logs_root);
            let block_receipts_root = combine(&block_root, &receipts_logs_root);
            let sub_root = combine(&raw_value_hash, &block_receipts_root);
            leaves.push(combine(&hash_key(&item.key), &sub_root));

            let tail = |first: MerkleNode, second: MerkleNode, key: &str| {
                vec![
                    first,
                    second,
                    MerkleNode::new(false, raw_value_hash),
                    MerkleNode::new(false, hash_key(key)),
                ]
            };
            let block_proof = tail(
                MerkleNode::new(true, tx_root),
                MerkleNode::new(true, receipts_logs_root),
                &item.key,
            );
            let transactions_proof = tail(
                MerkleNode::new(false, block_hash),
                MerkleNode::new(true, receipts_logs_root),
                &item.key,
            );
            let receipts_proof = tail(
                MerkleNode::new(true, logs_root),
                MerkleNode::new(false, block_root),
                &item.key,
            );

            processed.push((value, transactions, block_proof, transactions_proof, receipts_proof));
        }

        let mut records = Vec::with_capacity(bundle.data_items.len());
        for (index, (item, entry)) in bundle.data_items.iter().zip(processed).enumerate() {
            let (value, transactions, block_proof, transactions_proof, receipts_proof) = entry;
            let bundle_proof = compact_proof(&leaves, index)?;

            let block_hash_str = value
                .block
                .get("hash")
                .and_then(Value::as_str)
                .ok_or_else(|| IndexingError::MissingField {
                    key: item.key.clone(),
                    field: "block.hash",
                })?
                .to_string();

            let mut indices = vec![
                Index::new(IndexId::EvmBlock, block_hash_str.clone()),
                Index::new(IndexId::EvmReceipts, block_hash_str),
            ];
            for transaction in &transactions {
                let tx_hash = transaction.get("hash").and_then(Value::as_str).ok_or_else(
                    || IndexingError::MissingField {
                        key: item.key.clone(),
                        field: "transaction.hash",
                    },
                )?;
                indices.push(Index::new(IndexId::EvmTransaction, tx_hash.to_string()));
            }

            let stored = StoredBlock {
                block: value.block,
                receipts: value.receipts,
                block_proof,
                transactions_proof,
                receipts_proof,
                bundle_proof,
            };

            records.push(TrustlessRecord {
                value: serde_json::to_value(&stored)
                    .map_err(|source| IndexingError::ItemDecode { key: item.key.clone(), source })?,
                proof: String::new(),
                pool_id: bundle.pool_id,
                bundle_id: bundle.bundle_id,
                chain_id: bundle.chain_id.clone(),
                indices,
            });
        }

        Ok(records)
    }

    /// Synthesises the response for a block, transaction or receipts query
    /// from the stored intermediate structure.
    pub async fn intercept(
        &self,
        lookup: &dyn RecordLookup,
        index_id: IndexId,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<Option<Interception>, InterceptError> {
        if !matches!(
            index_id,
            IndexId::EvmBlock | IndexId::EvmTransaction | IndexId::EvmReceipts
        ) {
            return Ok(None);
        }
        let hash = params.get("hash").ok_or(InterceptError::BadQuery("hash"))?;

        let record = lookup.lookup(index_id, hash).await?;
        let stored: StoredBlock = serde_json::from_value(record.value)?;

        let (data, nodes) = match index_id {
            IndexId::EvmBlock => {
                let mut nodes = stored.block_proof;
                nodes.extend(stored.bundle_proof);
                (rpc::wrap_result(&stored.block), nodes)
            }
            IndexId::EvmReceipts => {
                let mut nodes = stored.receipts_proof;
                nodes.extend(stored.bundle_proof);
                (rpc::wrap_result(&serde_json::to_value(&stored.receipts)?), nodes)
            }
            IndexId::EvmTransaction => {
                let transactions = stored
                    .block
                    .get("transactions")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let position = transactions
                    .iter()
                    .position(|tx| tx.get("hash").and_then(Value::as_str) == Some(hash.as_str()))
                    .ok_or(InterceptError::TransactionNotFound)?;

                let tx_leaves = hash_all(&transactions)?;
                let mut nodes = compact_proof(&tx_leaves, position)?;
                nodes.extend(stored.transactions_proof);
                nodes.extend(stored.bundle_proof);
                (rpc::wrap_result(&transactions[position]), nodes)
            }
            _ => return Ok(None),
        };

        let proof = encode_proof_base64(
            record.pool_id,
            record.bundle_id,
            &record.chain_id,
            "",
            "result",
            &nodes,
        )?;
        Ok(Some(Interception { data, proof }))
    }
}

fn hash_all(values: &[Value]) -> Result<Vec<[u8; 32]>, MerkleError> {
    values.iter().map(hash_json).collect()
}

/// Aggregate hash of a possibly empty set: empty transaction or log sets
/// contribute the zero hash.
fn root_or_zero(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    // Non-empty roots cannot fail.
    merkle_root(leaves).unwrap_or([0u8; 32])
}
