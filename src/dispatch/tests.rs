//! Dispatch Module Tests
//!
//! Covers the worker pool mechanics, the algorithm registry, and the
//! dispatcher's mode routing and failure containment.

#[cfg(test)]
mod tests {
    use crate::dispatch::dispatcher::{SearchDispatcher, SearchMode};
    use crate::dispatch::pool::WorkerPool;
    use crate::dispatch::registry::{Algorithm, AlgorithmRegistry};
    use crate::index::{HashIndex, MembershipIndex};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn corpus(dir: &TempDir, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    // ============================================================
    // TEST 1: WorkerPool - submission and results
    // ============================================================

    #[tokio::test]
    async fn test_pool_submit_returns_result() {
        let pool = WorkerPool::new(2).unwrap();

        let result = pool.submit(|| 40 + 2).await.unwrap().unwrap();
        assert_eq!(result, 42);

        pool.join();
    }

    #[tokio::test]
    async fn test_pool_runs_work_concurrently() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let mut receivers = Vec::new();
        for _ in 0..32 {
            let counter = counter.clone();
            receivers.push(pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        for rx in receivers {
            rx.await.unwrap().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 32);
        pool.join();
    }

    #[tokio::test]
    async fn test_pool_survives_panicking_job() {
        let pool = WorkerPool::new(1).unwrap();

        // ACT: panic on the single worker thread.
        let panicked = pool.submit(|| panic!("intentional")).await.unwrap();
        assert!(panicked.is_err());

        // ASSERT: the same worker still serves later jobs.
        let result = pool.submit(|| "alive").await.unwrap().unwrap();
        assert_eq!(result, "alive");

        pool.join();
    }

    #[tokio::test]
    async fn test_pool_submit_after_join_fails() {
        let pool = WorkerPool::new(1).unwrap();
        pool.join();

        let rx = pool.submit(|| 1);
        assert!(rx.await.is_err());
    }

    // ============================================================
    // TEST 2: AlgorithmRegistry
    // ============================================================

    #[test]
    fn test_registry_builtin_algorithms() {
        let registry = AlgorithmRegistry::with_builtin();

        assert_eq!(registry.algorithm_count(), 9);
        assert!(registry.has_algorithm("Shell Grep"));
        assert!(registry.has_algorithm("Binary Search"));
        assert!(!registry.has_algorithm("Quantum Search"));

        let names = registry.list_algorithms();
        assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_registry_resolve_and_register() {
        let registry = AlgorithmRegistry::new();
        assert!(registry.resolve("Linear Scan").is_none());

        registry.register(
            "Linear Scan",
            Algorithm {
                reread: crate::index::reread::linear_scan,
                build: |path| Ok(Arc::new(HashIndex::build(path)?)),
            },
        );

        assert!(registry.resolve("Linear Scan").is_some());
        assert_eq!(registry.algorithm_count(), 1);
    }

    #[test]
    fn test_registry_builders_produce_working_indices() {
        let dir = TempDir::new().unwrap();
        let path = corpus(&dir, b"alpha\nbeta\n");
        let registry = AlgorithmRegistry::with_builtin();

        for name in registry.list_algorithms() {
            let algorithm = registry.resolve(&name).unwrap();
            let index = (algorithm.build)(&path).unwrap();
            assert!(index.contains(b"alpha"), "algorithm: {}", name);
            assert!(!index.contains(b"alp"), "algorithm: {}", name);
        }
    }

    // ============================================================
    // TEST 3: Dispatcher - preloaded mode
    // ============================================================

    #[tokio::test]
    async fn test_dispatch_preloaded_hash() {
        let dir = TempDir::new().unwrap();
        let path = corpus(&dir, b"alpha\nbeta\ngamma\n");
        let index: Arc<dyn MembershipIndex> = Arc::new(HashIndex::build(&path).unwrap());

        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let dispatcher = SearchDispatcher::new(
            pool.clone(),
            SearchMode::Preloaded { index },
            "Hash Set".to_string(),
        );

        assert_eq!(dispatcher.mode_label(), "preloaded");
        assert_eq!(dispatcher.algorithm_label(), "hash");

        let hit = dispatcher.dispatch(b"beta".to_vec()).await.unwrap();
        assert!(hit.matched);
        assert!(hit.err_kind.is_none());

        let miss = dispatcher.dispatch(b"delta".to_vec()).await.unwrap();
        assert!(!miss.matched);

        pool.join();
    }

    // ============================================================
    // TEST 4: Dispatcher - reread mode
    // ============================================================

    #[tokio::test]
    async fn test_dispatch_reread_observes_file_changes() {
        let dir = TempDir::new().unwrap();
        let path = corpus(&dir, b"first\n");

        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let dispatcher = SearchDispatcher::new(
            pool.clone(),
            SearchMode::Reread {
                path: path.clone(),
                search: crate::index::reread::linear_scan,
            },
            "Linear Scan".to_string(),
        );

        assert_eq!(dispatcher.mode_label(), "reread");
        assert_eq!(dispatcher.algorithm_label(), "Linear Scan");
        assert!(dispatcher.dispatch(b"first".to_vec()).await.unwrap().matched);

        std::fs::write(&path, b"second\n").unwrap();

        assert!(!dispatcher.dispatch(b"first".to_vec()).await.unwrap().matched);
        assert!(dispatcher.dispatch(b"second".to_vec()).await.unwrap().matched);

        pool.join();
    }

    #[tokio::test]
    async fn test_dispatch_reread_io_failure_is_search_error() {
        let dir = TempDir::new().unwrap();
        let path = corpus(&dir, b"first\n");

        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let dispatcher = SearchDispatcher::new(
            pool.clone(),
            SearchMode::Reread {
                path: path.clone(),
                search: crate::index::reread::linear_scan,
            },
            "Linear Scan".to_string(),
        );

        std::fs::remove_file(&path).unwrap();

        let err = dispatcher.dispatch(b"first".to_vec()).await.unwrap_err();
        assert_eq!(err.kind, "search_io");

        pool.join();
    }

    // ============================================================
    // TEST 5: Dispatcher - panic containment and isolation
    // ============================================================

    struct PanickingIndex;

    impl MembershipIndex for PanickingIndex {
        fn contains(&self, query: &[u8]) -> bool {
            if query == b"poison" {
                panic!("poisoned query");
            }
            query == b"good"
        }

        fn len(&self) -> usize {
            1
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_dispatch_panic_reports_non_match_and_pool_survives() {
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let dispatcher = SearchDispatcher::new(
            pool.clone(),
            SearchMode::Preloaded {
                index: Arc::new(PanickingIndex),
            },
            "Hash Set".to_string(),
        );

        // ACT: the poisoned query panics on the worker.
        let outcome = dispatcher.dispatch(b"poison".to_vec()).await.unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.err_kind, Some("worker_panic"));

        // ASSERT: a concurrent-style follow-up query is unaffected.
        let outcome = dispatcher.dispatch(b"good".to_vec()).await.unwrap();
        assert!(outcome.matched);
        assert!(outcome.err_kind.is_none());

        pool.join();
    }

    // ============================================================
    // TEST 6: timing and queue depth are reported
    // ============================================================

    #[tokio::test]
    async fn test_dispatch_reports_elapsed_and_queue_depth() {
        let dir = TempDir::new().unwrap();
        let mut contents = Vec::new();
        for i in 0..10_000 {
            contents.extend_from_slice(format!("row-{}\n", i).as_bytes());
        }
        let path = corpus(&dir, &contents);
        let index: Arc<dyn MembershipIndex> =
            Arc::new(crate::index::MmapScanIndex::build(&path).unwrap());

        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let dispatcher =
            SearchDispatcher::new(pool.clone(), SearchMode::Preloaded { index }, String::new());

        let outcome = dispatcher.dispatch(b"row-9999".to_vec()).await.unwrap();
        assert!(outcome.matched);
        assert!(outcome.elapsed_ns > 0);

        pool.join();
    }
}
