//! Endpoint binding descriptors returned by the indexer family.
//!
//! Bindings drive both the HTTP routing table and the OpenAPI synthesis.

use crate::index::IndexId;

/// One set of query parameters resolving to a single index lookup.
///
/// A request matches the set when every parameter is present as a non-empty
/// query value; the matched values joined with `-` form the index value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    /// The index the matched values resolve into.
    pub index_id: IndexId,
    /// The query parameter names, in compound-key order.
    pub params: Vec<&'static str>,
    /// Human readable descriptions, parallel to `params`.
    pub descriptions: Vec<&'static str>,
}

impl ParameterSet {
    /// Creates a parameter set.
    pub fn new(
        index_id: IndexId,
        params: &[&'static str],
        descriptions: &[&'static str],
    ) -> Self {
        Self { index_id, params: params.to_vec(), descriptions: descriptions.to_vec() }
    }
}

/// A single HTTP path exposed for a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The accepted parameter sets; the first fully present set wins.
    pub parameter_sets: Vec<ParameterSet>,
    /// The OpenAPI response schema name.
    pub schema: &'static str,
}

/// All paths of one indexer, in stable order.
pub type Bindings = Vec<(&'static str, Endpoint)>;
