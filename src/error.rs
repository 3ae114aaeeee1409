//! Error Types and Exit Codes
//!
//! Startup failures are fatal and map to distinct process exit codes so that
//! supervisor scripts and the benchmark driver can tell failure classes apart.
//! Per-connection and per-query failures never surface here; they are contained
//! by the connection handler and the dispatcher respectively.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Exit code constants for structured process exit.
pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG: i32 = 1;
pub const EXIT_BIND: i32 = 2;
pub const EXIT_TLS: i32 = 3;
pub const EXIT_CORPUS: i32 = 4;

/// Fatal startup errors. Anything that happens after `Serving` is reached is
/// handled per-connection and does not produce one of these.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration file is missing, unreadable, or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    /// The TLS certificate/key pair could not be loaded or generated.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Termination-signal handlers could not be registered at startup.
    #[error("failed to register signal handler: {source}")]
    Signal { source: io::Error },

    /// The corpus file could not be opened or read while building the index.
    #[error("cannot read corpus {}: {cause:#}", .path.display())]
    Corpus { path: PathBuf, cause: anyhow::Error },
}

impl ServerError {
    /// The process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::Config(_) => EXIT_CONFIG,
            ServerError::Bind { .. } => EXIT_BIND,
            ServerError::Tls(_) => EXIT_TLS,
            ServerError::Signal { .. } => EXIT_CONFIG,
            ServerError::Corpus { .. } => EXIT_CORPUS,
        }
    }
}
