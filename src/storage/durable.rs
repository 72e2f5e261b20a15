//! Durable Store Boundary
//!
//! The engine only needs an opaque key -> bytes store: `put`, `get`, and a key
//! listing for warm start. Two backends:
//! - [`MemoryStore`]: volatile, for tests and `--db :memory:`.
//! - [`RedbStore`]: an embedded transactional table on disk. redb is
//!   synchronous, so every call runs on the blocking pool.

use crate::error::{EngineError, Result};

use async_trait::async_trait;
use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const SUMMARIES: TableDefinition<&str, &[u8]> = TableDefinition::new("summaries");

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// `Ok(None)` is a normal miss, distinct from a read failure.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }
}

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens (or creates) the database file and makes sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(EngineError::persistence)?;

        let txn = db.begin_write().map_err(EngineError::persistence)?;
        txn.open_table(SUMMARIES).map_err(EngineError::persistence)?;
        txn.commit().map_err(EngineError::persistence)?;

        tracing::info!("Opened durable store at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(db.as_ref()))
            .await
            .map_err(EngineError::persistence)?
    }
}

#[async_trait]
impl DurableStore for RedbStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(EngineError::persistence)?;
            {
                let mut table = txn.open_table(SUMMARIES).map_err(EngineError::persistence)?;
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(EngineError::persistence)?;
            }
            txn.commit().map_err(EngineError::persistence)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(EngineError::persistence)?;
            let table = txn.open_table(SUMMARIES).map_err(EngineError::persistence)?;
            let value = table
                .get(key.as_str())
                .map_err(EngineError::persistence)?
                .map(|guard| guard.value().to_vec());
            Ok(value)
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.blocking(|db| {
            let txn = db.begin_read().map_err(EngineError::persistence)?;
            let table = txn.open_table(SUMMARIES).map_err(EngineError::persistence)?;
            let mut keys = Vec::new();
            for entry in table.iter().map_err(EngineError::persistence)? {
                let (key, _) = entry.map_err(EngineError::persistence)?;
                keys.push(key.value().to_string());
            }
            Ok(keys)
        })
        .await
    }
}
