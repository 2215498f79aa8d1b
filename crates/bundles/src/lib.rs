//! Fetching, verification and decoding of finalized bundles.
//!
//! The [BundleSource] talks to the chain REST mirrors and the storage
//! provider mirrors with failover; [codec::verify_and_decode] checks the
//! payload against the on-chain `data_hash` and unpacks it into data items.

pub mod codec;
pub mod errors;
pub mod fetch;
pub mod source;
pub mod traits;

pub use codec::{verify_and_decode, COMPRESSION_GZIP};
pub use errors::{CodecError, SourceError};
pub use fetch::Fetcher;
pub use source::{BundleSource, Endpoints};
pub use traits::BundleProvider;
