//! Flusher Module Tests
//!
//! ## Test Scopes
//! - **Flush pass**: dirty keys are persisted and cleaned; failures stay dirty.
//! - **Versioning**: an insert racing a write keeps the key dirty.
//! - **Lifecycle**: one-shot shutdown, final drain pass, `Running -> Draining -> Stopped`.
//! - **Restart**: flushed state reloads into a fresh store unchanged.

#[cfg(test)]
mod tests {
    use crate::config::SketchConfig;
    use crate::error::{EngineError, Result};
    use crate::flusher::{FlushCoordinator, FlushReport, FlushState};
    use crate::storage::{DurableStore, MemoryStore, RedbStore, SummarySnapshot, SummaryStore};

    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn small_config() -> SketchConfig {
        SketchConfig {
            filter_bits: 4_096,
            hash_count: 4,
            precision: 10,
            seed: 11,
        }
    }

    const SLOW: Duration = Duration::from_secs(3_600);

    /// Durable store whose writes can be switched to fail.
    struct FailingStore {
        inner: MemoryStore,
        failing: AtomicBool,
        attempts: AtomicUsize,
    }

    impl FailingStore {
        fn new(failing: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                failing: AtomicBool::new(failing),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DurableStore for FailingStore {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(EngineError::PersistenceFailure("disk on fire".to_string()));
            }
            self.inner.put(key, bytes).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    /// Durable store that inserts into the summary store while a write is in
    /// flight, between the flush snapshot and the dirty-flag clear.
    struct InterleavingStore {
        inner: MemoryStore,
        store: Arc<SummaryStore>,
    }

    #[async_trait]
    impl DurableStore for InterleavingStore {
        async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
            self.store.insert(key, b"late arrival");
            self.inner.put(key, bytes).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    async fn wait_for_state(handle: &crate::flusher::FlushHandle, wanted: FlushState) {
        for _ in 0..200 {
            if handle.state() == wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("coordinator never reached {}", wanted);
    }

    // ============================================================
    // FLUSH PASS TESTS
    // ============================================================

    #[tokio::test]
    async fn test_flush_once_persists_dirty_keys() {
        // ARRANGE
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        store.insert("users", b"alice");
        store.insert("groups", b"admins");
        store.get_or_create("untouched");
        let coordinator = FlushCoordinator::new(store.clone(), durable.clone(), SLOW);

        // ACT
        let report = coordinator.flush_once().await;

        // ASSERT
        assert_eq!(report, FlushReport { flushed: 2, failed: 0 });
        assert!(store.list_dirty().is_empty());
        assert_eq!(durable.len(), 2, "clean keys are not written");

        let bytes = durable.get("users").await.unwrap().unwrap();
        let decoded = SummarySnapshot::decode(&bytes).unwrap();
        assert!(decoded.filter.test(b"alice"));
    }

    #[tokio::test]
    async fn test_flush_once_with_nothing_dirty() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        let coordinator = FlushCoordinator::new(store, durable.clone(), SLOW);

        assert_eq!(coordinator.flush_once().await, FlushReport::default());
        assert!(durable.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_key_dirty_and_retries() {
        // ARRANGE
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(FailingStore::new(true));
        store.insert("users", b"alice");
        let coordinator = FlushCoordinator::new(store.clone(), durable.clone(), SLOW);

        // ACT: first pass fails
        let report = coordinator.flush_once().await;

        // ASSERT: queries are unaffected and the key awaits retry
        assert_eq!(report, FlushReport { flushed: 0, failed: 1 });
        assert_eq!(store.list_dirty(), vec!["users".to_string()]);
        assert_eq!(store.exists("users", b"alice"), Ok(true));

        // ACT: storage recovers
        durable.failing.store(false, Ordering::SeqCst);
        let report = coordinator.flush_once().await;

        // ASSERT
        assert_eq!(report, FlushReport { flushed: 1, failed: 0 });
        assert!(store.list_dirty().is_empty());
        assert_eq!(durable.attempts.load(Ordering::SeqCst), 2);
        assert!(durable.get("users").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_during_write_keeps_key_dirty() {
        // ARRANGE
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(InterleavingStore {
            inner: MemoryStore::new(),
            store: store.clone(),
        });
        store.insert("users", b"alice");
        let coordinator = FlushCoordinator::new(store.clone(), durable.clone(), SLOW);

        // ACT
        let report = coordinator.flush_once().await;

        // ASSERT: the written state predates the late insert, so it must be flushed again
        assert_eq!(report.flushed, 1);
        assert_eq!(store.list_dirty(), vec!["users".to_string()]);
        let bytes = durable.get("users").await.unwrap().unwrap();
        assert!(!SummarySnapshot::decode(&bytes).unwrap().filter.test(b"late arrival"));
    }

    #[tokio::test]
    async fn test_concurrent_passes_do_not_double_write() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(FailingStore::new(false));
        for i in 0..20 {
            store.insert(&format!("key-{}", i), b"v");
        }
        let coordinator = FlushCoordinator::new(store.clone(), durable.clone(), SLOW);

        let (a, b) = tokio::join!(coordinator.flush_once(), coordinator.flush_once());

        assert_eq!(a.flushed + b.flushed, 20);
        assert_eq!(durable.attempts.load(Ordering::SeqCst), 20);
    }

    // ============================================================
    // LIFECYCLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_shutdown_is_delivered_once() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        let handle = FlushCoordinator::new(store, durable, SLOW).spawn();

        assert!(handle.shutdown());
        assert!(!handle.shutdown());
        assert!(!handle.shutdown());

        assert!(handle.stopped().await.is_ok());
    }

    #[tokio::test]
    async fn test_state_moves_from_running_to_stopped() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        let handle = FlushCoordinator::new(store, durable, SLOW).spawn();

        assert_eq!(handle.state(), FlushState::Running);

        handle.shutdown();
        wait_for_state(&handle, FlushState::Stopped).await;
        assert_eq!(handle.stopped().await, Ok(FlushReport::default()));
    }

    #[tokio::test]
    async fn test_shutdown_runs_final_flush() {
        // ARRANGE: an interval long enough that no periodic pass runs
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        let handle = FlushCoordinator::new(store.clone(), durable.clone(), SLOW).spawn();
        store.insert("users", b"alice");
        store.insert("users", b"bob");

        // ACT
        handle.shutdown();
        let report = handle.stopped().await.unwrap();

        // ASSERT
        assert_eq!(report, FlushReport { flushed: 1, failed: 0 });
        assert!(durable.get("users").await.unwrap().is_some());
        assert!(store.list_dirty().is_empty());
    }

    #[tokio::test]
    async fn test_failing_final_flush_still_stops() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(FailingStore::new(true));
        store.insert("users", b"alice");
        let handle = FlushCoordinator::new(store.clone(), durable, SLOW).spawn();

        handle.shutdown();
        let report = handle.stopped().await.unwrap();

        assert_eq!(report, FlushReport { flushed: 0, failed: 1 });
        assert_eq!(store.dirty_count(), 1);
    }

    #[tokio::test]
    async fn test_periodic_pass_flushes_in_background() {
        let store = Arc::new(SummaryStore::new(small_config()));
        let durable = Arc::new(MemoryStore::new());
        let handle =
            FlushCoordinator::new(store.clone(), durable.clone(), Duration::from_millis(20)).spawn();
        store.insert("users", b"alice");

        let mut persisted = false;
        for _ in 0..200 {
            if durable.get("users").await.unwrap().is_some() {
                persisted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(persisted, "periodic pass never ran");
        assert_eq!(handle.state(), FlushState::Running);
        handle.shutdown();
        handle.stopped().await.unwrap();
    }

    // ============================================================
    // RESTART TESTS
    // ============================================================

    #[tokio::test]
    async fn test_restart_restores_identical_answers() {
        // ARRANGE: a first process lifetime
        let durable = Arc::new(MemoryStore::new());
        let before = Arc::new(SummaryStore::new(small_config()));
        for name in ["alice", "bob", "carol", "dave"] {
            before.insert("users", name.as_bytes());
        }
        before.insert("groups", b"admins");
        let coordinator = FlushCoordinator::new(before.clone(), durable.clone(), SLOW);
        coordinator.flush_once().await;

        // ACT: a second process lifetime warm-starts from the same store
        let after = SummaryStore::new(small_config());
        after.restore_from(durable.as_ref()).await.unwrap();

        // ASSERT
        for name in ["alice", "bob", "carol", "dave", "mallory"] {
            assert_eq!(
                after.exists("users", name.as_bytes()),
                before.exists("users", name.as_bytes())
            );
        }
        assert_eq!(after.cardinality("users"), before.cardinality("users"));
        assert_eq!(after.cardinality("groups"), before.cardinality("groups"));
    }

    #[tokio::test]
    async fn test_restart_through_redb_file() {
        let suffix: u64 = rand::random();
        let path = std::env::temp_dir().join(format!("hyperbloom-flush-{:x}.redb", suffix));

        {
            let durable = Arc::new(RedbStore::open(&path).unwrap());
            let store = Arc::new(SummaryStore::new(small_config()));
            let handle = FlushCoordinator::new(store.clone(), durable.clone(), SLOW).spawn();
            store.insert("users", b"alice");
            store.insert("users", b"bob");

            handle.shutdown();
            handle.stopped().await.unwrap();
        }

        let durable = RedbStore::open(&path).unwrap();
        let restarted = SummaryStore::new(small_config());
        assert_eq!(restarted.restore_from(&durable).await, Ok(1));
        assert_eq!(restarted.exists("users", b"alice"), Ok(true));
        assert_eq!(restarted.exists("users", b"bob"), Ok(true));
        assert_eq!(restarted.cardinality("users").unwrap(), (2, 2));

        drop(durable);
        let _ = std::fs::remove_file(&path);
    }
}
