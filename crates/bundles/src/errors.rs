//! Error types for the bundle source and the payload codec.

use thiserror::Error;

/// Errors raised while talking to upstream mirrors.
#[derive(Error, Debug)]
pub enum SourceError {
    /// No REST endpoints are configured for the chain.
    #[error("no rest endpoints configured for chain {0}")]
    UnknownChain(String),
    /// The bundle metadata references a storage provider without configured
    /// mirrors.
    #[error("bundle has an invalid storage provider id {0}")]
    UnknownStorageProvider(String),
    /// A metadata field failed to parse.
    #[error("invalid bundle metadata: {0}")]
    InvalidMetadata(&'static str),
    /// Every configured mirror failed after the retry budget.
    #[error("upstream unavailable: {context}")]
    UpstreamUnavailable {
        /// What was being fetched when the mirrors ran dry.
        context: String,
    },
    /// A mirror answered with a non-2xx status.
    #[error("got status code {status} != 2xx from {url}")]
    Status {
        /// The response status code.
        status: u16,
        /// The requested url.
        url: String,
    },
    /// The request itself failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The upstream response body failed to decode.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised while verifying and decoding a bundle payload.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The payload hash does not match the on-chain `data_hash`.
    #[error("integrity mismatch: expected sha256 {expected}, found {found}")]
    IntegrityMismatch {
        /// The hash attested on-chain.
        expected: String,
        /// The hash of the fetched payload.
        found: String,
    },
    /// The bundle metadata names a compression this codec does not know.
    #[error("unknown compression id {0}")]
    UnknownCompression(String),
    /// The payload failed to decompress.
    #[error("failed to decompress payload: {0}")]
    Decompress(#[from] std::io::Error),
    /// The decompressed body is not a data item array.
    #[error("failed to decode bundle body: {0}")]
    Decode(#[from] serde_json::Error),
}
