//! Tracing subscriber setup.

use anyhow::{anyhow, Result};
use tracing::Level;

/// Initializes the global fmt subscriber from the `log` config value.
pub fn init(level: &str) -> Result<()> {
    let level = match level {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "" | "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        other => return Err(anyhow!("unknown log level {other}")),
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}
