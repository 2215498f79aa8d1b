//! SHA-256 binary merkle trees over canonical JSON leaves, compact inclusion
//! proofs, and the versioned proof wire codec.

pub mod errors;
pub mod proof;
pub mod tree;

pub use errors::{MerkleError, ProofCodecError};
pub use proof::{
    decode_proof, decode_proof_base64, encode_proof, encode_proof_base64, DecodedProof,
    PROOF_VERSION,
};
pub use tree::{combine, compact_proof, hash_json, hash_key, merkle_root, verify_compact};
