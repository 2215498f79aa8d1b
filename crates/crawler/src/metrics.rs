//! Prometheus metrics for the crawler.

use lazy_static::lazy_static;
use prometheus::{
    register_gauge_vec, register_int_counter_vec, register_int_gauge_vec, GaugeVec, IntCounterVec,
    IntGaugeVec,
};

const LABELS: &[&str] = &["pool_id", "chain_id"];

lazy_static! {
    /// Counts started crawl cycles per pool.
    pub static ref SYNC_STARTED: IntCounterVec =
        register_int_counter_vec!("sync_started", "Number of started crawl cycles", LABELS)
            .expect("sync_started failed to register");

    /// Counts finished crawl cycles per pool.
    pub static ref SYNC_FINISHED: IntCounterVec =
        register_int_counter_vec!("sync_finished", "Number of finished crawl cycles", LABELS)
            .expect("sync_finished failed to register");

    /// Counts fully ingested bundles per pool.
    pub static ref BUNDLES_SYNCED: IntCounterVec =
        register_int_counter_vec!("bundles_synced", "Number of ingested bundles", LABELS)
            .expect("bundles_synced failed to register");

    /// Counts failed cycles that will be retried on the next tick.
    pub static ref SYNC_STEP_FAILED_RETRY: IntCounterVec = register_int_counter_vec!(
        "sync_step_failed_retry",
        "Number of failed crawl cycles awaiting retry",
        LABELS
    )
    .expect("sync_step_failed_retry failed to register");

    /// Latest known bundle id per pool.
    pub static ref BUNDLE_HEIGHT: IntGaugeVec =
        register_int_gauge_vec!("bundle_height", "Latest known bundle id", LABELS)
            .expect("bundle_height failed to register");

    /// Seconds the most recent bundle ingest took.
    pub static ref BUNDLE_PROCESS_DURATION: GaugeVec = register_gauge_vec!(
        "bundle_process_duration",
        "Seconds spent ingesting the most recent bundle",
        LABELS
    )
    .expect("bundle_process_duration failed to register");
}
