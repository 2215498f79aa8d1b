//! The request server: one GET per `(pool, path, parameter set)`, resolving
//! queries through the catalog and object store, with the inclusion proof
//! in the `x-kyve-proof` response header.

pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::{run, ServePool, ServerConfig};
