//! The relational catalog: per `(chain, pool)` tables mapping
//! `(index_id, value)` pairs to object-store handles, with bundle-level
//! presence tracking.

pub mod adapter;
pub mod database;
pub mod errors;

pub use adapter::CatalogAdapter;
pub use database::{table_names, DatabaseConfig, DatabaseKind};
pub use errors::CatalogError;
