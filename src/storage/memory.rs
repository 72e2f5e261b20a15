use super::durable::DurableStore;
use super::summary::{Summary, SummarySnapshot};
use crate::config::SketchConfig;
use crate::error::{EngineError, Result};
use crate::sketch::BitFilter;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

pub type SummaryHandle = Arc<Mutex<Summary>>;

/// The in-memory source of truth: one [`Summary`] per key.
///
/// The map itself is sharded (`DashMap`), and every summary sits behind its own
/// mutex, so inserts to unrelated keys never contend. Map guards are released
/// before a summary lock is taken; lock order is always shard -> summary.
pub struct SummaryStore {
    summaries: DashMap<String, SummaryHandle>,
    config: SketchConfig,
}

impl SummaryStore {
    pub fn new(config: SketchConfig) -> Self {
        Self {
            summaries: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Returns the summary for `key`, creating a zero-state one on first access.
    /// Concurrent first accesses converge on a single summary.
    pub fn get_or_create(&self, key: &str) -> SummaryHandle {
        if let Some(existing) = self.summaries.get(key) {
            return existing.value().clone();
        }

        self.summaries
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating summary for key {:?}", key);
                Arc::new(Mutex::new(Summary::new(&self.config)))
            })
            .value()
            .clone()
    }

    fn handle(&self, key: &str) -> Option<SummaryHandle> {
        self.summaries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: &str, value: &[u8]) {
        let summary = self.get_or_create(key);
        summary.lock().insert(value);
    }

    /// Inserts and returns the cardinality observed under the same lock.
    pub fn insert_and_count(&self, key: &str, value: &[u8]) -> (u64, u64) {
        let summary = self.get_or_create(key);
        let mut guard = summary.lock();
        guard.insert(value);
        guard.cardinality()
    }

    pub fn exists(&self, key: &str, value: &[u8]) -> Result<bool> {
        let summary = self
            .handle(key)
            .ok_or_else(|| EngineError::UnknownKey(key.to_string()))?;
        let hit = summary.lock().test(value);
        Ok(hit)
    }

    /// Membership test where an unknown key behaves as an empty filter.
    pub fn test(&self, key: &str, value: &[u8]) -> bool {
        self.handle(key)
            .map(|summary| summary.lock().test(value))
            .unwrap_or(false)
    }

    pub fn cardinality(&self, key: &str) -> Result<(u64, u64)> {
        let summary = self
            .handle(key)
            .ok_or_else(|| EngineError::UnknownKey(key.to_string()))?;
        let counts = summary.lock().cardinality();
        Ok(counts)
    }

    pub fn snapshot(&self, key: &str) -> Result<SummarySnapshot> {
        let summary = self
            .handle(key)
            .ok_or_else(|| EngineError::UnknownKey(key.to_string()))?;
        let snapshot = summary.lock().snapshot();
        Ok(snapshot)
    }

    /// Copy of the key's filter, or an empty filter of the configured shape
    /// when the key is unknown.
    pub fn filter_or_empty(&self, key: &str) -> BitFilter {
        match self.handle(key) {
            Some(summary) => summary.lock().filter().clone(),
            None => self.empty_filter(),
        }
    }

    pub fn empty_filter(&self) -> BitFilter {
        BitFilter::new(self.config.filter_bits, self.config.hash_count, self.config.seed)
    }

    /// Keys whose in-memory state has not been persisted yet. Unordered.
    pub fn list_dirty(&self) -> Vec<String> {
        let handles: Vec<(String, SummaryHandle)> = self
            .summaries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        handles
            .into_iter()
            .filter(|(_, summary)| summary.lock().is_dirty())
            .map(|(key, _)| key)
            .collect()
    }

    pub fn mark_clean(&self, key: &str, version: u64) -> bool {
        self.handle(key)
            .map(|summary| summary.lock().mark_clean(version))
            .unwrap_or(false)
    }

    /// Installs persisted state for `key`. An existing summary is overwritten
    /// in place under its own lock, so handles already given out observe the
    /// restored state; any of its inserts not yet flushed are discarded.
    pub fn restore(&self, key: &str, snapshot: SummarySnapshot) {
        let existing = match self.summaries.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let summary = Summary::restored(snapshot.filter, snapshot.estimator);
                entry.insert(Arc::new(Mutex::new(summary)));
                return;
            }
        };
        // shard guard is gone; only the summary lock is held below
        existing
            .lock()
            .replace_with(snapshot.filter, snapshot.estimator);
    }

    /// Reloads one key from the durable store. Returns `Ok(false)` if the store
    /// has no entry for it.
    pub async fn load(&self, durable: &dyn DurableStore, key: &str) -> Result<bool> {
        match durable.get(key).await? {
            Some(bytes) => {
                let snapshot = SummarySnapshot::decode(&bytes).map_err(|e| match e {
                    EngineError::CorruptState(reason) => {
                        EngineError::CorruptState(format!("key {:?}: {}", key, reason))
                    }
                    other => other,
                })?;
                self.restore(key, snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Warm start: loads every key the durable store knows about.
    pub async fn restore_from(&self, durable: &dyn DurableStore) -> Result<usize> {
        let keys = durable.keys().await?;
        let mut restored = 0;

        for key in keys {
            if self.load(durable, &key).await? {
                restored += 1;
            } else {
                tracing::debug!("Key {:?} vanished from the durable store during restore", key);
            }
        }

        tracing::info!("Restored {} summaries from durable store", restored);
        Ok(restored)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.list_dirty().len()
    }
}
