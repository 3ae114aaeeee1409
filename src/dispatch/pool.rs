use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-parallelism pool of OS threads for CPU-bound membership searches.
///
/// Work is queued on an unbounded channel; the server never drops requests.
/// Each submitted closure runs under `catch_unwind` so a panicking search
/// kills neither its worker thread nor the pool.
pub struct WorkerPool {
    injector: Mutex<Option<Sender<Job>>>,
    queue: Receiver<Job>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    parallelism: usize,
}

impl WorkerPool {
    /// Spawns `parallelism` worker threads. Callers default this to the
    /// number of hardware cores.
    pub fn new(parallelism: usize) -> Result<Self> {
        let parallelism = parallelism.max(1);
        let (injector, queue) = crossbeam_channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(parallelism);
        for worker_id in 0..parallelism {
            let queue = queue.clone();
            let handle = thread::Builder::new()
                .name(format!("search-worker-{}", worker_id))
                .spawn(move || {
                    while let Ok(job) = queue.recv() {
                        job();
                    }
                    tracing::debug!("Search worker {} stopped", worker_id);
                })
                .context("spawning search worker thread")?;
            workers.push(handle);
        }

        tracing::info!("Worker pool started with {} threads", parallelism);

        Ok(Self {
            injector: Mutex::new(Some(injector)),
            queue,
            workers: Mutex::new(workers),
            parallelism,
        })
    }

    /// Enqueues `work` and returns a future for its result.
    ///
    /// The receiver yields `Err` for a panicking closure and fails outright
    /// when the pool has shut down.
    pub fn submit<F, T>(&self, work: F) -> oneshot::Receiver<thread::Result<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(work));
            // The caller may have gone away; the result is then discarded.
            let _ = tx.send(result);
        });

        let sent = match self.injector.lock().expect("pool injector poisoned").as_ref() {
            Some(injector) => injector.send(job).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!("Work submitted to a stopped worker pool");
        }

        rx
    }

    /// Number of queued jobs not yet claimed by a worker.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Stops accepting work, drains the queue, and joins every worker.
    pub fn join(&self) {
        self.injector.lock().expect("pool injector poisoned").take();

        let workers = std::mem::take(&mut *self.workers.lock().expect("pool workers poisoned"));
        for handle in workers {
            let _ = handle.join();
        }
        tracing::info!("Worker pool joined");
    }
}
