//! Search Dispatch
//!
//! Bridges the I/O reactor and the CPU-bound membership searches.
//!
//! ## Architecture Overview
//! 1. **Submission**: the connection handler hands a normalized query to the
//!    `SearchDispatcher`.
//! 2. **Execution**: the query runs on a `WorkerPool` of OS threads so a slow
//!    scan can never starve the accept loop. The pool queue is unbounded; if
//!    its depth exceeds a soft limit the overload is made observable through
//!    the per-query log rather than by dropping work.
//! 3. **Timing**: wall time is measured on the worker around the `contains`
//!    call only, with a monotonic clock; queueing and socket I/O are excluded.
//! 4. **Containment**: a panicking search is caught on the worker, reported as
//!    a non-match, and the pool is preserved.
//!
//! ## Submodules
//! - **`pool`**: fixed-parallelism OS-thread pool with a `submit -> future`
//!   interface.
//! - **`registry`**: maps algorithm display names to a reread search function
//!   and a preloaded index builder.
//! - **`dispatcher`**: mode routing (preloaded index vs fresh file scan) and
//!   per-query measurement.

pub mod dispatcher;
pub mod pool;
pub mod registry;

pub use dispatcher::{SearchDispatcher, SearchError, SearchMode, SearchOutcome};
pub use pool::WorkerPool;
pub use registry::{Algorithm, AlgorithmRegistry};

#[cfg(test)]
mod tests;
