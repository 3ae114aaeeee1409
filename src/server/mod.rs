//! TCP Server
//!
//! Owns the listening socket and everything a connection touches.
//!
//! ## Submodules
//! - **`connection`**: per-connection framing, dispatch, and the one-shot
//!   request/response protocol.
//! - **`supervisor`**: the `Init -> Binding -> Serving -> Draining -> Stopped`
//!   lifecycle, signal handling, and graceful drain.
//! - **`tls`**: certificate loading with self-signed fallback and the TLS
//!   acceptor wrapped around accepted sockets.
//! - **`daemon`**: double-fork daemonisation, PID file, and artifact cleanup.

pub mod connection;
pub mod daemon;
pub mod supervisor;
pub mod tls;

pub use supervisor::Server;
