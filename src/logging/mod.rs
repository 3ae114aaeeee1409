//! Structured Query Log
//!
//! Emits exactly one machine-parseable record per completed query, one JSON
//! object per line, suitable for post-hoc benchmark aggregation.
//!
//! Writes never block the connection handler on disk I/O: records flow
//! through a bounded channel to a background writer task. When the channel is
//! at capacity the handler awaits space instead of dropping the record, so
//! ordering is preserved and no record is lost. Records are ordered by query
//! completion time, not by receipt of the request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[cfg(test)]
mod tests;

/// Bounded channel capacity between handlers and the writer task.
const LOG_CHANNEL_CAPACITY: usize = 1024;

/// One record per completed query. Field order is deterministic and matches
/// the declaration order below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Completion timestamp, milliseconds since the Unix epoch.
    pub ts: u64,
    /// Peer address of the client connection.
    pub peer: String,
    /// `preloaded` or `reread`.
    pub mode: String,
    /// Index name (preloaded) or algorithm display name (reread).
    pub algorithm: String,
    /// Length of the normalized query in bytes.
    pub query_len: usize,
    pub matched: bool,
    /// Wall time of the `contains` call on the worker.
    pub elapsed_ns: u64,
    /// Worker pool queue depth observed at dispatch.
    pub queue_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_kind: Option<String>,
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Cloneable handle used by connection handlers to emit records.
#[derive(Clone)]
pub struct QueryLog {
    tx: mpsc::Sender<QueryRecord>,
}

/// Owns the background writer task; joined on shutdown to flush the log.
pub struct QueryLogWriter {
    task: JoinHandle<()>,
}

impl QueryLog {
    /// Opens `path` for appending (creating parent directories as needed) and
    /// spawns the background writer task.
    pub async fn open(path: &Path) -> Result<(QueryLog, QueryLogWriter)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening query log {}", path.display()))?;

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let task = tokio::spawn(writer_loop(file, rx));

        Ok((QueryLog { tx }, QueryLogWriter { task }))
    }

    /// Emits one record. Returns immediately while the channel has capacity;
    /// otherwise waits for space rather than dropping the record.
    pub async fn record(&self, record: QueryRecord) {
        if let Err(mpsc::error::TrySendError::Full(record)) = self.tx.try_send(record) {
            if self.tx.send(record).await.is_err() {
                tracing::warn!("Query log writer stopped; record dropped");
            }
        }
    }
}

impl QueryLogWriter {
    /// Waits for the writer task to drain and flush. All `QueryLog` handles
    /// must be dropped first for the task to finish.
    pub async fn shutdown(self) {
        if self.task.await.is_err() {
            tracing::warn!("Query log writer task failed during shutdown");
        }
    }
}

async fn writer_loop(file: File, mut rx: mpsc::Receiver<QueryRecord>) {
    let mut writer = BufWriter::new(file);

    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize query record: {}", e);
                continue;
            }
        };
        line.push(b'\n');

        if let Err(e) = writer.write_all(&line).await {
            tracing::error!("Failed to write query record: {}", e);
            continue;
        }
        // Flush per record so an abrupt stop loses nothing.
        if let Err(e) = writer.flush().await {
            tracing::error!("Failed to flush query log: {}", e);
        }
    }

    let _ = writer.flush().await;
    tracing::debug!("Query log writer stopped");
}
