//! The indexer family: per-runtime modules that decompose one bundle into N
//! trustless records, each carrying its inclusion proof and secondary
//! indices, plus the read-time interception hook.

pub mod celestia;
pub mod errors;
pub mod ethereum_blobs;
pub mod evm;
pub mod height;
pub mod indexer;
pub mod tendermint;

pub use errors::{IndexingError, InterceptError, LookupError};
pub use indexer::{Indexer, Interception, RecordLookup};
