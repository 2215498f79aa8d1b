//! YAML configuration loading.
//!
//! A missing config file is created from the embedded template so fresh
//! deployments start with a documented baseline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use tracing::info;
use trustless_bundles::Endpoints;
use trustless_types::PoolConfig;

/// The commented default config written on first start.
const DEFAULT_TEMPLATE: &str = include_str!("../config.template.yml");

/// Top level configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advisory memory budget in MB; 0 means unbounded.
    #[serde(rename = "RAM")]
    pub ram: u64,
    /// Crawler settings.
    pub crawler: CrawlerSection,
    /// Object storage settings.
    pub storage: StorageSection,
    /// Catalog database settings.
    pub database: DatabaseSection,
    /// Request server settings.
    pub server: ServerSection,
    /// Metrics exporter settings.
    pub prometheus: PrometheusSection,
    /// Log level: error, warn, info, debug or trace.
    pub log: String,
    /// The pools to crawl and serve.
    pub pools: Vec<PoolConfig>,
    /// Upstream mirror urls.
    pub endpoints: Endpoints,
}

/// Crawler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerSection {
    /// Process-wide bound on in-flight bundle workers.
    pub threads: usize,
}

impl Default for CrawlerSection {
    fn default() -> Self {
        Self { threads: 4 }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Driver: `local` or `s3`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Root directory of the local driver.
    pub path: String,
    /// Payload compression: empty or `gzip`.
    pub compression: String,
    /// Custom S3 endpoint url.
    #[serde(rename = "aws-endpoint")]
    pub aws_endpoint: String,
    /// S3 region, `auto` for R2.
    pub region: String,
    /// S3 bucket name.
    pub bucketname: String,
    /// S3 credentials.
    pub credentials: CredentialsSection,
    /// Per-bundle bound on concurrent payload writes.
    pub threads: usize,
    /// CDN base url S3 handles can redirect to.
    pub cdn: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            kind: "local".to_string(),
            path: "./data".to_string(),
            compression: String::new(),
            aws_endpoint: String::new(),
            region: "auto".to_string(),
            bucketname: String::new(),
            credentials: CredentialsSection::default(),
            threads: 4,
            cdn: String::new(),
        }
    }
}

/// Static S3 credentials.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    /// Access key id.
    pub keyid: String,
    /// Access key secret.
    pub keysecret: String,
}

/// Catalog database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Backend: `sqlite` or `postgres`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Database name; the file path for sqlite.
    pub dbname: String,
    /// Server host.
    pub host: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Server port.
    pub port: u16,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            kind: "sqlite".to_string(),
            dbname: "./database.db".to_string(),
            host: String::new(),
            user: String::new(),
            password: String::new(),
            port: 0,
        }
    }
}

/// Request server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// The port the request server binds on.
    pub port: u16,
    /// Whether S3 handles redirect to the CDN instead of being proxied.
    pub redirect: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 4242, redirect: true }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusSection {
    /// Whether the exporter runs at all.
    pub enabled: bool,
    /// The port the exporter binds on.
    pub port: u16,
}

impl Default for PrometheusSection {
    fn default() -> Self {
        Self { enabled: true, port: 2112 }
    }
}

/// Loads the config file, creating it from the template when missing.
pub fn load(path: &str) -> Result<Config> {
    let path = Path::new(path);
    if !path.exists() {
        info!(target: "config", "no config found at {}, creating one with default values", path.display());
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        }
        std::fs::write(path, DEFAULT_TEMPLATE)
            .with_context(|| format!("failed to write default config to {}", path.display()))?;
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    let mut config: Config =
        serde_yaml::from_str(&raw).context("failed to parse config file")?;

    if config.log.is_empty() {
        config.log = "info".to_string();
    }
    if config.endpoints.chains.is_empty() {
        config.endpoints.chains = default_chain_endpoints();
    }
    if config.endpoints.storage.is_empty() {
        config.endpoints.storage = default_storage_endpoints();
    }
    Ok(config)
}

fn default_chain_endpoints() -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("kyve-1".to_string(), vec!["https://api.kyve.network".to_string()]),
        ("kaon-1".to_string(), vec!["https://api.kaon.kyve.network".to_string()]),
        ("korellia-2".to_string(), vec!["https://api.korellia.kyve.network".to_string()]),
    ])
}

fn default_storage_endpoints() -> HashMap<u32, Vec<String>> {
    HashMap::from([
        (1, vec!["https://arweave.net".to_string()]),
        (2, vec!["https://arweave.net".to_string()]),
        (3, vec!["https://storage.kyve.network".to_string()]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "{}").unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.crawler.threads, 4);
        assert_eq!(config.storage.kind, "local");
        assert_eq!(config.database.kind, "sqlite");
        assert_eq!(config.server.port, 4242);
        assert!(config.server.redirect);
        assert_eq!(config.log, "info");
        assert!(!config.endpoints.chains.is_empty());
    }

    #[test]
    fn test_missing_file_is_created_from_the_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let config = load(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 4242);
    }

    #[test]
    fn test_pool_and_endpoint_sections_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            r#"
RAM: 2048
log: debug
crawler:
  threads: 8
pools:
  - bundle_start_id: 0
    chain_id: kaon-1
    indexer: ethereum-blobs
    pool_id: 21
    slug: blobs
    exclude_proof: false
endpoints:
  chains:
    kaon-1:
      - https://api.kaon.kyve.network
  storage:
    1:
      - https://arweave.net
"#,
        )
        .unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.ram, 2048);
        assert_eq!(config.log, "debug");
        assert_eq!(config.crawler.threads, 8);
        assert_eq!(config.pools.len(), 1);
        assert_eq!(config.pools[0].slug, "blobs");
        assert_eq!(config.pools[0].pool_id, 21);
        assert_eq!(config.endpoints.chains["kaon-1"].len(), 1);
        assert_eq!(config.endpoints.storage[&1].len(), 1);
    }
}
