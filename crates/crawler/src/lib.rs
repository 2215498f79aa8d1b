//! The crawler: enumerates missing bundle ids per pool and drives
//! fetch → verify → index → commit under a shared concurrency budget.

pub mod crawler;
pub mod errors;
pub mod metrics;

pub use crawler::{Crawler, PoolCrawler, CRAWL_INTERVAL};
pub use errors::CrawlerError;
