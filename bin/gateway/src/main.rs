//! Entrypoint of the trustless gateway.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{error, info};
use trustless_bundles::BundleSource;
use trustless_catalog::{CatalogAdapter, DatabaseConfig, DatabaseKind};
use trustless_crawler::{Crawler, PoolCrawler};
use trustless_indexers::Indexer;
use trustless_server::{ServePool, ServerConfig};
use trustless_storage::{LocalStore, ObjectStore, S3Config, S3Store};

mod cli;
mod config;
mod metrics;
mod telemetry;

use cli::{Cli, Commands};
use config::Config;

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("trustless-gateway {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config::load(&cli.config)?;
    telemetry::init(&config.log)?;
    if config.ram > 0 {
        // There is no runtime memory-limit call to hand this to; it stays an
        // operator-visible setting.
        info!(target: "gateway", "memory budget configured at {} MB", config.ram);
    }

    if config.prometheus.enabled {
        let port = config.prometheus.port;
        actix_web::rt::spawn(async move {
            if let Err(err) = metrics::serve_metrics(port).await {
                error!(target: "gateway", "metrics exporter failed: {err}");
            }
        });
    }

    let adapters = build_adapters(&config).await?;

    match cli.command {
        Commands::Start => {
            let pools = adapters
                .into_iter()
                .map(|adapter| {
                    Arc::new(ServePool {
                        slug: adapter.config().slug.clone(),
                        adapter,
                        redirect: config.server.redirect,
                        cdn: (!config.storage.cdn.is_empty())
                            .then(|| config.storage.cdn.clone()),
                    })
                })
                .collect();
            trustless_server::run(ServerConfig { port: config.server.port }, pools)
                .await
                .context("request server failed")
        }
        Commands::Crawler => {
            let source = Arc::new(BundleSource::new(config.endpoints.clone()));
            let semaphore = Arc::new(Semaphore::new(config.crawler.threads.max(1)));
            let children = adapters
                .into_iter()
                .map(|adapter| {
                    Arc::new(PoolCrawler::new(source.clone(), adapter, semaphore.clone()))
                })
                .collect();
            Crawler::new(children).start().await;
            Ok(())
        }
        Commands::Version => unreachable!("handled before config loading"),
    }
}

/// Opens the shared database and object store and wires one catalog adapter
/// per configured pool.
async fn build_adapters(config: &Config) -> Result<Vec<Arc<CatalogAdapter>>> {
    let kind = DatabaseKind::from_name(&config.database.kind)
        .ok_or_else(|| anyhow!("unknown database type {}", config.database.kind))?;
    let database = DatabaseConfig {
        kind,
        dbname: config.database.dbname.clone(),
        host: config.database.host.clone(),
        user: config.database.user.clone(),
        password: config.database.password.clone(),
        port: config.database.port,
    };
    let pool = database.connect().await.context("failed to open catalog database")?;

    let store: Arc<dyn ObjectStore> = match config.storage.kind.as_str() {
        "local" => Arc::new(LocalStore::new(
            config.storage.path.clone(),
            config.storage.compression == "gzip",
        )),
        "s3" => Arc::new(
            S3Store::connect(S3Config {
                endpoint: config.storage.aws_endpoint.clone(),
                region: config.storage.region.clone(),
                bucket: config.storage.bucketname.clone(),
                key_id: config.storage.credentials.keyid.clone(),
                key_secret: config.storage.credentials.keysecret.clone(),
                compression: config.storage.compression == "gzip",
            })
            .await,
        ),
        other => return Err(anyhow!("unknown storage type {other}")),
    };

    // One writer mutex for the whole process; all pools share the database.
    let write_lock = Arc::new(Mutex::new(()));

    let mut adapters = Vec::with_capacity(config.pools.len());
    for pool_config in &config.pools {
        let indexer = Indexer::from_name(&pool_config.indexer)
            .ok_or_else(|| anyhow!("cannot resolve indexer {}", pool_config.indexer))?;
        let adapter = CatalogAdapter::new(
            pool.clone(),
            kind,
            pool_config.clone(),
            indexer,
            store.clone(),
            write_lock.clone(),
            config.storage.threads,
        )
        .await
        .with_context(|| format!("failed to set up catalog for pool {}", pool_config.pool_id))?;
        adapters.push(Arc::new(adapter));
    }
    Ok(adapters)
}
