//! The per-pool catalog adapter: indexes bundles, persists record payloads
//! and registers them under their secondary indices in one logical commit.

use crate::{
    database::{table_names, DatabaseKind},
    errors::CatalogError,
};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use std::{collections::HashSet, fmt, sync::Arc};
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinSet,
};
use tracing::{debug, info};
use trustless_indexers::{Indexer, LookupError, RecordLookup};
use trustless_storage::ObjectStore;
use trustless_types::{
    Bundle, FileType, IndexId, PoolConfig, SavedFile, TrustlessRecord,
};

/// Data item rows are bulk-inserted in batches of this size.
const INSERT_BATCH_SIZE: usize = 50;

/// One pool's window into the catalog.
///
/// Writers across all pools sharing one database serialise behind a
/// process-wide mutex; reads run lock-free.
pub struct CatalogAdapter {
    pool: AnyPool,
    kind: DatabaseKind,
    config: PoolConfig,
    indexer: Indexer,
    store: Arc<dyn ObjectStore>,
    write_lock: Arc<Mutex<()>>,
    storage_threads: usize,
    data_table: String,
    index_table: String,
}

impl fmt::Debug for CatalogAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogAdapter")
            .field("chain_id", &self.config.chain_id)
            .field("pool_id", &self.config.pool_id)
            .field("data_table", &self.data_table)
            .finish_non_exhaustive()
    }
}

impl CatalogAdapter {
    /// Creates the adapter and migrates its two tables.
    pub async fn new(
        pool: AnyPool,
        kind: DatabaseKind,
        config: PoolConfig,
        indexer: Indexer,
        store: Arc<dyn ObjectStore>,
        write_lock: Arc<Mutex<()>>,
        storage_threads: usize,
    ) -> Result<Self, CatalogError> {
        let (data_table, index_table) = table_names(&config.chain_id, config.pool_id);
        let adapter = Self {
            pool,
            kind,
            config,
            indexer,
            store,
            write_lock,
            storage_threads: storage_threads.max(1),
            data_table,
            index_table,
        };
        adapter.migrate().await?;
        Ok(adapter)
    }

    /// The pool's indexer.
    pub const fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Whether this pool serves records without proofs.
    pub const fn exclude_proof(&self) -> bool {
        self.config.exclude_proof
    }

    /// The pool configuration backing this adapter.
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    async fn migrate(&self) -> Result<(), CatalogError> {
        // Schema evolution stays local to the pool because the table names
        // are parameterised by (chain, pool).
        let (id_column, integer) = match self.kind {
            DatabaseKind::Sqlite => ("id INTEGER PRIMARY KEY AUTOINCREMENT", "INTEGER"),
            DatabaseKind::Postgres => ("id BIGSERIAL PRIMARY KEY", "BIGINT"),
        };
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {} ({id_column}, bundle_id {integer} NOT NULL, \
                 file_type {integer} NOT NULL, file_path TEXT NOT NULL)",
                self.data_table
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS ix_{}_bundle_id ON {} (bundle_id)",
                self.data_table, self.data_table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (value TEXT NOT NULL, index_id {integer} NOT \
                 NULL, data_item_id {integer} NOT NULL, PRIMARY KEY (value, index_id))",
                self.index_table
            ),
        ];
        let _guard = self.write_lock.lock().await;
        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Indexes and persists one bundle atomically. Re-saving an already
    /// present bundle is a no-op, which together with deterministic object
    /// names makes crash-and-retry converge on exactly one set of rows.
    pub async fn save(&self, bundle: &Bundle) -> Result<(), CatalogError> {
        if self.has_bundle(bundle.bundle_id).await? {
            debug!(
                target: "catalog",
                "bundle {} already present for pool {}, skipping", bundle.bundle_id, self.config.pool_id
            );
            return Ok(());
        }

        let records = self.indexer.index_bundle(bundle, self.config.exclude_proof)?;
        let files = self.save_objects(&records).await?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut row_ids = Vec::with_capacity(records.len());
        for chunk in files.chunks(INSERT_BATCH_SIZE) {
            let sql = self.data_insert_sql(chunk.len());
            let mut query = sqlx::query(&sql);
            for file in chunk {
                query = query
                    .bind(bundle.bundle_id as i64)
                    .bind(file.file_type.code())
                    .bind(file.path.clone());
            }
            for row in query.fetch_all(&mut *tx).await? {
                row_ids.push(row.try_get::<i64, _>(0)?);
            }
        }

        let mut index_rows = Vec::new();
        for (row_id, record) in row_ids.iter().zip(&records) {
            for index in &record.indices {
                index_rows.push((index.value.clone(), index.index_id.code(), *row_id));
            }
        }
        for chunk in index_rows.chunks(INSERT_BATCH_SIZE) {
            let sql = self.index_insert_sql(chunk.len());
            let mut query = sqlx::query(&sql);
            for (value, index_id, row_id) in chunk {
                query = query.bind(value.clone()).bind(*index_id).bind(*row_id);
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            target: "catalog",
            "saved bundle {} with {} records for pool {}",
            bundle.bundle_id,
            records.len(),
            self.config.pool_id
        );
        Ok(())
    }

    /// Resolves an index lookup into the stored file handle.
    pub async fn get(&self, index_id: IndexId, value: &str) -> Result<SavedFile, CatalogError> {
        let sql = format!(
            "SELECT d.file_type, d.file_path FROM {} i JOIN {} d ON d.id = i.data_item_id \
             WHERE i.index_id = {} AND i.value = {} LIMIT 1",
            self.index_table,
            self.data_table,
            self.kind.placeholder(1),
            self.kind.placeholder(2),
        );
        let row = sqlx::query(&sql)
            .bind(index_id.code())
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let code = row.try_get::<i64, _>(0)?;
        let file_type = FileType::from_code(code).ok_or(CatalogError::InvalidFileType(code))?;
        Ok(SavedFile { file_type, path: row.try_get::<String, _>(1)? })
    }

    /// Loads and decodes a record payload behind a file handle.
    pub async fn load_record(&self, file: &SavedFile) -> Result<TrustlessRecord, CatalogError> {
        let raw = self.store.load(&file.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// The ids in `[start, last]` without any data item row.
    pub async fn missing_bundles(&self, start: u64, last: u64) -> Result<Vec<u64>, CatalogError> {
        if last < start {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT bundle_id FROM {} WHERE bundle_id BETWEEN {} AND {}",
            self.data_table,
            self.kind.placeholder(1),
            self.kind.placeholder(2),
        );
        let rows = sqlx::query(&sql)
            .bind(start as i64)
            .bind(last as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut present = HashSet::with_capacity(rows.len());
        for row in rows {
            present.insert(row.try_get::<i64, _>(0)? as u64);
        }
        Ok((start..=last).filter(|id| !present.contains(id)).collect())
    }

    async fn has_bundle(&self, bundle_id: u64) -> Result<bool, CatalogError> {
        let sql = format!(
            "SELECT id FROM {} WHERE bundle_id = {} LIMIT 1",
            self.data_table,
            self.kind.placeholder(1),
        );
        let row = sqlx::query(&sql).bind(bundle_id as i64).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    /// Writes all record payloads concurrently, bounded by the storage
    /// thread budget. Results keep record order so the relational insert can
    /// zip them back together.
    async fn save_objects(
        &self,
        records: &[TrustlessRecord],
    ) -> Result<Vec<SavedFile>, CatalogError> {
        let semaphore = Arc::new(Semaphore::new(self.storage_threads));
        let attach_proof = !self.config.exclude_proof;
        let mut workers = JoinSet::new();

        for (position, record) in records.iter().enumerate() {
            let record = record.clone();
            let store = self.store.clone();
            let semaphore = semaphore.clone();
            workers.spawn(async move {
                // The semaphore only closes when dropped, which cannot
                // happen while workers hold a clone.
                let _permit = semaphore.acquire_owned().await.ok();
                store.save(&record, attach_proof).await.map(|file| (position, file))
            });
        }

        let mut files = vec![SavedFile::default(); records.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok((position, file))) => files[position] = file,
                Ok(Err(err)) => {
                    workers.abort_all();
                    return Err(err.into());
                }
                Err(err) => {
                    workers.abort_all();
                    return Err(CatalogError::Worker(err.to_string()));
                }
            }
        }
        Ok(files)
    }

    fn data_insert_sql(&self, rows: usize) -> String {
        let mut sql =
            format!("INSERT INTO {} (bundle_id, file_type, file_path) VALUES ", self.data_table);
        let mut position = 1;
        for row in 0..rows {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!(
                "({}, {}, {})",
                self.kind.placeholder(position),
                self.kind.placeholder(position + 1),
                self.kind.placeholder(position + 2),
            ));
            position += 3;
        }
        sql.push_str(" RETURNING id");
        sql
    }

    fn index_insert_sql(&self, rows: usize) -> String {
        let mut sql = format!(
            "INSERT INTO {} (value, index_id, data_item_id) VALUES ",
            self.index_table
        );
        let mut position = 1;
        for row in 0..rows {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!(
                "({}, {}, {})",
                self.kind.placeholder(position),
                self.kind.placeholder(position + 1),
                self.kind.placeholder(position + 2),
            ));
            position += 3;
        }
        sql
    }
}

#[async_trait]
impl RecordLookup for CatalogAdapter {
    async fn lookup(&self, index_id: IndexId, value: &str) -> Result<TrustlessRecord, LookupError> {
        let file = self.get(index_id, value).await.map_err(|err| match err {
            CatalogError::NotFound => LookupError::NotFound,
            other => LookupError::Resolve(other.to_string()),
        })?;
        self.load_record(&file).await.map_err(|err| LookupError::Resolve(err.to_string()))
    }
}
