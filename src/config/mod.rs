//! Server Configuration
//!
//! Parses the `key=value` configuration file that controls which corpus is
//! served, whether it is re-read on every query, the listening port, and
//! whether the listener is wrapped in TLS.
//!
//! ## Recognized keys
//! - **`linuxpath`**: path to the corpus file. Must resolve to a readable
//!   regular file at load time.
//! - **`REREAD_ON_QUERY`**: when true the corpus is re-read on every query and
//!   no index is built; when false the corpus is loaded once at startup.
//! - **`USE_SSL`**: when true the listener is wrapped in TLS.
//! - **`PORT`**: TCP port in `1..=65535`.

pub mod loader;

pub use loader::{load_config_file, ServerConfig};

#[cfg(test)]
mod tests;
