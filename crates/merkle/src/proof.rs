//! Versioned wire codec for inclusion proofs.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! [ u8 version = 1 ]
//! [ u16 pool id ]
//! [ u64 bundle id ]
//! [ chain_id \0 ] [ data_item_key \0 ] [ data_item_value_key \0 ]
//! repeated: [ u8 left ] [ 32 byte sha-256 ]
//! ```
//!
//! The decoder rejects any other version byte, truncated fixed fields,
//! unterminated strings and trailing partial node records.

use crate::errors::ProofCodecError;
use base64::{engine::general_purpose::STANDARD, Engine};
use trustless_types::MerkleNode;

/// The only version byte written and accepted.
pub const PROOF_VERSION: u8 = 1;

/// A fully decoded proof envelope.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodedProof {
    /// The pool the proven record belongs to.
    pub pool_id: u16,
    /// The bundle the proven record belongs to.
    pub bundle_id: u64,
    /// The chain the pool lives on.
    pub chain_id: String,
    /// The key of the source data item, empty for decomposed records.
    pub data_item_key: String,
    /// The response field holding the proven value (`result` for JSON-RPC
    /// envelopes), empty for raw responses.
    pub data_item_value_key: String,
    /// The compact proof path, leaf level first.
    pub proof: Vec<MerkleNode>,
}

/// Encodes a proof into the wire format.
pub fn encode_proof(
    pool_id: u16,
    bundle_id: u64,
    chain_id: &str,
    data_item_key: &str,
    data_item_value_key: &str,
    proof: &[MerkleNode],
) -> Result<Vec<u8>, ProofCodecError> {
    let mut out = Vec::with_capacity(1 + 2 + 8 + chain_id.len() + 3 + proof.len() * 33);
    out.push(PROOF_VERSION);
    out.extend_from_slice(&pool_id.to_be_bytes());
    out.extend_from_slice(&bundle_id.to_be_bytes());
    push_string(&mut out, chain_id, "chain_id")?;
    push_string(&mut out, data_item_key, "data_item_key")?;
    push_string(&mut out, data_item_value_key, "data_item_value_key")?;

    for node in proof {
        let raw = hex::decode(&node.hash)
            .map_err(|_| ProofCodecError::InvalidNodeHash(node.hash.clone()))?;
        if raw.len() != 32 {
            return Err(ProofCodecError::InvalidNodeHash(node.hash.clone()));
        }
        out.push(node.left as u8);
        out.extend_from_slice(&raw);
    }

    Ok(out)
}

/// Encodes a proof and wraps it in base64, the form carried by the
/// `x-kyve-proof` header and stored on records.
pub fn encode_proof_base64(
    pool_id: u16,
    bundle_id: u64,
    chain_id: &str,
    data_item_key: &str,
    data_item_value_key: &str,
    proof: &[MerkleNode],
) -> Result<String, ProofCodecError> {
    let raw = encode_proof(pool_id, bundle_id, chain_id, data_item_key, data_item_value_key, proof)?;
    Ok(STANDARD.encode(raw))
}

/// Decodes a wire format proof.
pub fn decode_proof(raw: &[u8]) -> Result<DecodedProof, ProofCodecError> {
    let (version, rest) = raw.split_first().ok_or(ProofCodecError::Truncated("version"))?;
    if *version != PROOF_VERSION {
        return Err(ProofCodecError::UnsupportedVersion(*version));
    }

    if rest.len() < 10 {
        return Err(ProofCodecError::Truncated("header"));
    }
    let pool_id = u16::from_be_bytes([rest[0], rest[1]]);
    let bundle_id = u64::from_be_bytes([
        rest[2], rest[3], rest[4], rest[5], rest[6], rest[7], rest[8], rest[9],
    ]);
    let mut rest = &rest[10..];

    let chain_id = take_string(&mut rest, "chain_id")?;
    let data_item_key = take_string(&mut rest, "data_item_key")?;
    let data_item_value_key = take_string(&mut rest, "data_item_value_key")?;

    if rest.len() % 33 != 0 {
        return Err(ProofCodecError::PartialNode);
    }
    let proof = rest
        .chunks_exact(33)
        .map(|chunk| {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&chunk[1..]);
            MerkleNode::new(chunk[0] == 1, hash)
        })
        .collect();

    Ok(DecodedProof { pool_id, bundle_id, chain_id, data_item_key, data_item_value_key, proof })
}

/// Decodes a base64 wrapped wire format proof.
pub fn decode_proof_base64(encoded: &str) -> Result<DecodedProof, ProofCodecError> {
    let raw =
        STANDARD.decode(encoded).map_err(|e| ProofCodecError::InvalidBase64(e.to_string()))?;
    decode_proof(&raw)
}

fn push_string(out: &mut Vec<u8>, value: &str, field: &'static str) -> Result<(), ProofCodecError> {
    if value.as_bytes().contains(&0) {
        return Err(ProofCodecError::EmbeddedNull(field));
    }
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    Ok(())
}

fn take_string(rest: &mut &[u8], field: &'static str) -> Result<String, ProofCodecError> {
    let end = rest
        .iter()
        .position(|byte| *byte == 0)
        .ok_or(ProofCodecError::UnterminatedString(field))?;
    let value = std::str::from_utf8(&rest[..end])
        .map_err(|_| ProofCodecError::InvalidUtf8(field))?
        .to_string();
    *rest = &rest[end + 1..];
    Ok(value)
}
