//! Merkle tree construction and compact inclusion proofs.
//!
//! Leaves are SHA-256 hashes of canonical JSON: keys sorted ascending with no
//! insignificant whitespace, which is exactly what `serde_json` emits for its
//! map-backed [serde_json::Value]. Levels of odd length duplicate their last
//! node before pairing; a one-leaf tree's root is the leaf itself.

use crate::errors::MerkleError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use trustless_types::MerkleNode;

/// Hashes a value's canonical JSON serialisation.
///
/// The value is first lifted into a [serde_json::Value] so that struct field
/// order never leaks into the hash; the map-backed value type serialises its
/// keys sorted.
pub fn hash_json<T: Serialize>(value: &T) -> Result<[u8; 32], MerkleError> {
    let canonical = serde_json::to_value(value)?;
    let serialized = serde_json::to_vec(&canonical)?;
    Ok(Sha256::digest(&serialized).into())
}

/// Hashes a data item key.
pub fn hash_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// Hashes the concatenation of two nodes into their parent.
pub fn combine(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Computes the root over the given leaves.
pub fn merkle_root(leaves: &[[u8; 32]]) -> Result<[u8; 32], MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyTree);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&mut level);
    }
    Ok(level[0])
}

/// Computes the compact inclusion proof for `leaf_index`: the ordered list of
/// sibling hashes from the leaf level up, each annotated with the position of
/// the current hash in its parent combination.
pub fn compact_proof(
    leaves: &[[u8; 32]],
    leaf_index: usize,
) -> Result<Vec<MerkleNode>, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyTree);
    }
    if leaf_index >= leaves.len() {
        return Err(MerkleError::LeafIndexOutOfBounds { index: leaf_index, leaves: leaves.len() });
    }

    let mut level = leaves.to_vec();
    let mut index = leaf_index;
    let mut proof = Vec::new();

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        // An even index sits on the left of its pair, so the recorded sibling
        // concatenates on the right.
        if index % 2 == 0 {
            proof.push(MerkleNode::new(true, level[index + 1]));
        } else {
            proof.push(MerkleNode::new(false, level[index - 1]));
        }
        level = next_level(&mut level);
        index /= 2;
    }

    Ok(proof)
}

/// Recomputes the root from a leaf and its compact proof and compares it
/// against the expected root.
pub fn verify_compact(
    leaf: [u8; 32],
    proof: &[MerkleNode],
    root: [u8; 32],
) -> Result<bool, MerkleError> {
    let mut current = leaf;
    for node in proof {
        let raw = hex::decode(&node.hash)
            .map_err(|_| MerkleError::InvalidSiblingHash(node.hash.clone()))?;
        let sibling: [u8; 32] = raw
            .try_into()
            .map_err(|_| MerkleError::InvalidSiblingHash(node.hash.clone()))?;
        current = if node.left { combine(&current, &sibling) } else { combine(&sibling, &current) };
    }
    Ok(current == root)
}

fn next_level(level: &mut Vec<[u8; 32]>) -> Vec<[u8; 32]> {
    if level.len() % 2 == 1 {
        let last = level[level.len() - 1];
        level.push(last);
    }
    level.chunks_exact(2).map(|pair| combine(&pair[0], &pair[1])).collect()
}
