//! Error type for crawl cycles.

use thiserror::Error;
use trustless_bundles::{CodecError, SourceError};
use trustless_catalog::CatalogError;

/// Errors aborting a bundle worker or a crawl cycle.
///
/// Every kind is retried the same way: the worker stops, siblings get
/// cancelled and the next scheduled cycle starts over from the missing set.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetching metadata or payload failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Payload verification or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Indexing, storing or committing the bundle failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
