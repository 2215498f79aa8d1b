//! The driver seam and shared path/encoding helpers.

use crate::errors::StorageError;
use async_trait::async_trait;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};
use trustless_types::{SavedFile, TrustlessRecord};

/// Writes and reads opaque record payloads addressed by a computed path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persists a record and returns its handle. With `attach_proof` unset
    /// the proof field is stripped before serialisation.
    async fn save(
        &self,
        record: &TrustlessRecord,
        attach_proof: bool,
    ) -> Result<SavedFile, StorageError>;

    /// Reads a payload back by its path.
    async fn load(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Computes the deterministic object path of a record:
/// `<chain>/<pool>/<bundle>/<unique_record_name>.{json|gz}`.
pub fn object_path(record: &TrustlessRecord, compressed: bool) -> String {
    let extension = if compressed { "gz" } else { "json" };
    format!(
        "{}/{}/{}/{}.{}",
        record.chain_id,
        record.pool_id,
        record.bundle_id,
        record.unique_name(),
        extension
    )
}

/// Serialises a record body, optionally stripping the proof and gzipping.
pub(crate) fn encode_record(
    record: &TrustlessRecord,
    attach_proof: bool,
    compress: bool,
) -> Result<Vec<u8>, StorageError> {
    let body = if attach_proof {
        serde_json::to_vec(record)?
    } else {
        let mut stripped = record.clone();
        stripped.proof = String::new();
        serde_json::to_vec(&stripped)?
    };
    if !compress {
        return Ok(body);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    Ok(encoder.finish()?)
}

/// Inflates a payload when its path marks it as gzipped.
pub(crate) fn decode_body(path: &str, raw: Vec<u8>) -> Result<Vec<u8>, StorageError> {
    if !path.ends_with(".gz") {
        return Ok(raw);
    }
    let mut out = Vec::new();
    GzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}
