//! Line-Membership Query Server Library
//!
//! This library crate defines the core modules of the TCP query service.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The server is composed of five loosely coupled subsystems:
//!
//! - **`config`**: The `key=value` configuration loader. Determines the corpus
//!   path, the reread-vs-preloaded operating mode, TLS, and the listen port.
//! - **`index`**: The membership oracles. Several interchangeable
//!   representations (hash set, trie, sorted, mmap scan, native open-addressing
//!   set) all answering exact line membership, plus the reread-mode search
//!   algorithms that scan the live file per query.
//! - **`dispatch`**: The bridge between the I/O reactor and CPU-bound
//!   searches: an OS-thread worker pool, the algorithm registry, and the
//!   per-query measurement.
//! - **`server`**: Connection handling (framing, one-shot request/response,
//!   TLS) and the supervisor lifecycle with graceful drain.
//! - **`logging`**: The structured per-query log consumed by the offline
//!   benchmark report.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod logging;
pub mod server;
