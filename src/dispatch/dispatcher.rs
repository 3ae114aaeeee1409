use super::pool::WorkerPool;
use super::registry::RereadFn;
use crate::index::MembershipIndex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// How queries are answered for the lifetime of the process. Exactly one of
/// the two holds: an index is present, or every query re-reads the corpus.
pub enum SearchMode {
    Preloaded { index: Arc<dyn MembershipIndex> },
    Reread { path: PathBuf, search: RereadFn },
}

/// Result of one completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub matched: bool,
    /// Wall time around the `contains` call only, monotonic clock.
    pub elapsed_ns: u64,
    /// Pool queue depth observed at submission.
    pub queue_depth: usize,
    /// Set when the search was contained rather than completed cleanly
    /// (currently only `worker_panic`).
    pub err_kind: Option<&'static str>,
}

/// A search that could not produce a verdict; the connection answers `ERROR`.
#[derive(Debug, thiserror::Error)]
#[error("search failed: {kind}")]
pub struct SearchError {
    pub kind: &'static str,
    pub elapsed_ns: u64,
    pub queue_depth: usize,
}

/// Routes queries to the prebuilt index or to a fresh file scan, bounded by
/// the worker pool.
pub struct SearchDispatcher {
    pool: Arc<WorkerPool>,
    mode: SearchMode,
    algorithm: String,
    /// Queue depth beyond which overload is called out in the server log.
    queue_soft_limit: usize,
}

impl SearchDispatcher {
    pub fn new(pool: Arc<WorkerPool>, mode: SearchMode, algorithm: String) -> Arc<Self> {
        let queue_soft_limit = pool.parallelism() * 4;
        Arc::new(Self {
            pool,
            mode,
            algorithm,
            queue_soft_limit,
        })
    }

    /// Mode label used in per-query log records.
    pub fn mode_label(&self) -> &'static str {
        match self.mode {
            SearchMode::Preloaded { .. } => "preloaded",
            SearchMode::Reread { .. } => "reread",
        }
    }

    /// Algorithm label used in per-query log records: the index name in
    /// preloaded mode, the registry display name in reread mode.
    pub fn algorithm_label(&self) -> &str {
        match &self.mode {
            SearchMode::Preloaded { index } => index.name(),
            SearchMode::Reread { .. } => &self.algorithm,
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.pool.queue_depth()
    }

    /// Runs one membership search on the worker pool.
    ///
    /// A panicking search is contained: the outcome reports a non-match with
    /// `err_kind = worker_panic` and the pool keeps serving. Only failures
    /// that prevent any verdict (reread I/O errors, a stopped pool) surface
    /// as `SearchError`.
    pub async fn dispatch(&self, query: Vec<u8>) -> Result<SearchOutcome, SearchError> {
        let queue_depth = self.pool.queue_depth();
        if queue_depth > self.queue_soft_limit {
            tracing::warn!(
                "Worker pool queue depth {} exceeds soft limit {}",
                queue_depth,
                self.queue_soft_limit
            );
        }

        let work: Box<dyn FnOnce() -> (anyhow::Result<bool>, u64) + Send> = match &self.mode {
            SearchMode::Preloaded { index } => {
                let index = index.clone();
                Box::new(move || {
                    let start = Instant::now();
                    let matched = index.contains(&query);
                    (Ok(matched), start.elapsed().as_nanos() as u64)
                })
            }
            SearchMode::Reread { path, search } => {
                let path = path.clone();
                let search = *search;
                Box::new(move || {
                    let start = Instant::now();
                    let result = search(&path, &query);
                    (result, start.elapsed().as_nanos() as u64)
                })
            }
        };

        match self.pool.submit(work).await {
            Ok(Ok((Ok(matched), elapsed_ns))) => Ok(SearchOutcome {
                matched,
                elapsed_ns,
                queue_depth,
                err_kind: None,
            }),
            Ok(Ok((Err(error), elapsed_ns))) => {
                tracing::error!("Search failed: {:#}", error);
                Err(SearchError {
                    kind: "search_io",
                    elapsed_ns,
                    queue_depth,
                })
            }
            Ok(Err(_panic)) => {
                tracing::error!("Search worker panicked; reporting non-match");
                Ok(SearchOutcome {
                    matched: false,
                    elapsed_ns: 0,
                    queue_depth,
                    err_kind: Some("worker_panic"),
                })
            }
            Err(_closed) => Err(SearchError {
                kind: "pool_stopped",
                elapsed_ns: 0,
                queue_depth,
            }),
        }
    }
}
