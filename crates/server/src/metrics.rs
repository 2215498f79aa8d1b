//! Prometheus metrics for the request server.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Counts served requests by pool, path and response status.
    pub static ref REQUESTS_SERVED: IntCounterVec = register_int_counter_vec!(
        "requests_served",
        "Number of served requests",
        &["pool", "path", "status"]
    )
    .expect("requests_served failed to register");
}
