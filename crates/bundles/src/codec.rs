//! Payload verification and decoding.

use crate::errors::CodecError;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::io::Read;
use trustless_types::{DataItem, FinalizedBundle};

/// The only compression id defined by the protocol.
pub const COMPRESSION_GZIP: u32 = 1;

/// Verifies a fetched payload against the bundle's on-chain `data_hash`,
/// decompresses it and decodes the outer body into data items.
pub fn verify_and_decode(
    meta: &FinalizedBundle,
    payload: &[u8],
) -> Result<Vec<DataItem>, CodecError> {
    let found = hex::encode(Sha256::digest(payload));
    if found != meta.data_hash {
        return Err(CodecError::IntegrityMismatch { expected: meta.data_hash.clone(), found });
    }

    let body = match meta.compression() {
        Some(COMPRESSION_GZIP) => decompress_gzip(payload)?,
        _ => return Err(CodecError::UnknownCompression(meta.compression_id.clone())),
    };

    Ok(serde_json::from_slice(&body)?)
}

fn decompress_gzip(input: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut out = Vec::new();
    GzDecoder::new(input).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use serde_json::json;
    use std::io::Write;

    fn gzip(input: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input).unwrap();
        encoder.finish().unwrap()
    }

    fn meta_for(payload: &[u8]) -> FinalizedBundle {
        FinalizedBundle {
            compression_id: "1".to_string(),
            data_hash: hex::encode(Sha256::digest(payload)),
            ..Default::default()
        }
    }

    #[test]
    fn test_verify_and_decode_round_trip() {
        let body = serde_json::to_vec(&json!([
            { "key": "1", "value": { "n": 1 } },
            { "key": "2", "value": { "n": 2 } },
        ]))
        .unwrap();
        let payload = gzip(&body);
        let items = verify_and_decode(&meta_for(&payload), &payload).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "1");
        assert_eq!(items[1].value, json!({ "n": 2 }));
    }

    #[test]
    fn test_integrity_mismatch_is_rejected() {
        let payload = gzip(b"[]");
        let mut meta = meta_for(&payload);
        meta.data_hash = "00".repeat(32);
        let err = verify_and_decode(&meta, &payload).unwrap_err();
        assert!(matches!(err, CodecError::IntegrityMismatch { .. }));
    }

    #[test]
    fn test_unknown_compression_is_rejected() {
        let payload = gzip(b"[]");
        let mut meta = meta_for(&payload);
        meta.compression_id = "2".to_string();
        let err = verify_and_decode(&meta, &payload).unwrap_err();
        assert!(matches!(err, CodecError::UnknownCompression(id) if id == "2"));
    }

    #[test]
    fn test_corrupt_gzip_is_rejected() {
        let payload = b"not gzip at all".to_vec();
        let err = verify_and_decode(&meta_for(&payload), &payload).unwrap_err();
        assert!(matches!(err, CodecError::Decompress(_)));
    }

    #[test]
    fn test_non_array_body_is_rejected() {
        let payload = gzip(br#"{"key":"1"}"#);
        let err = verify_and_decode(&meta_for(&payload), &payload).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
