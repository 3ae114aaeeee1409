use crate::dispatch::SearchDispatcher;
use crate::logging::{now_ms, QueryLog, QueryRecord};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

/// Hard cap on one request, terminator included.
pub const MAX_QUERY_BYTES: usize = 1024;

/// Inactivity timeout for a single socket read or write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(10);

pub const RESPONSE_EXISTS: &[u8] = b"STRING EXISTS\n";
pub const RESPONSE_NOT_FOUND: &[u8] = b"STRING NOT FOUND\n";
pub const RESPONSE_ERROR: &[u8] = b"ERROR\n";

/// Normalizes a framed request into the query compared against corpus lines:
/// strips a single trailing `\n`, then a single trailing `\r`, then any
/// trailing NUL bytes, in that order. Interior NULs are preserved and match
/// literally.
pub fn normalize_query(raw: &[u8]) -> &[u8] {
    let mut query = raw;
    if let Some(stripped) = query.strip_suffix(b"\n") {
        query = stripped;
    }
    if let Some(stripped) = query.strip_suffix(b"\r") {
        query = stripped;
    }
    while let Some(stripped) = query.strip_suffix(&[0u8]) {
        query = stripped;
    }
    query
}

/// Reads one request frame: bytes up to the first `\n`, or up to
/// `MAX_QUERY_BYTES`, whichever comes first.
///
/// Returns `None` when the connection must be closed without a response:
/// immediate EOF, a read error or timeout, or the buffer filling up with no
/// terminator in sight.
async fn read_frame<S>(stream: &mut S) -> Option<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; MAX_QUERY_BYTES];
    let mut filled = 0;

    loop {
        let read = tokio::time::timeout(IO_TIMEOUT, stream.read(&mut buf[filled..])).await;
        let n = match read {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::debug!("Read failed: {}", e);
                return None;
            }
            Err(_elapsed) => {
                tracing::debug!("Connection idle for {:?}; closing", IO_TIMEOUT);
                return None;
            }
        };

        if n == 0 {
            // EOF. Nothing received means nothing to answer; a partial
            // unterminated request is framed as-is.
            if filled == 0 {
                return None;
            }
            return Some(buf[..filled].to_vec());
        }

        let scan_from = filled;
        filled += n;

        if let Some(pos) = buf[scan_from..filled].iter().position(|b| *b == b'\n') {
            // Bytes after the terminator are ignored; there is no pipelining.
            return Some(buf[..scan_from + pos].to_vec());
        }

        if filled == MAX_QUERY_BYTES {
            tracing::debug!("Request exceeded {} bytes without terminator", MAX_QUERY_BYTES);
            return None;
        }
    }
}

/// Resolves once the drain grace window has expired. The flag is level-
/// triggered: a receiver that starts polling after the deadline still
/// resolves immediately.
async fn abandoned(abandon: &mut watch::Receiver<bool>) {
    if abandon.wait_for(|expired| *expired).await.is_err() {
        // The supervisor dropped the sender without ever expiring the
        // window; no abandon can happen any more.
        std::future::pending::<()>().await;
    }
}

/// Serves one connection: frame one query, dispatch it, write exactly one
/// response, close.
///
/// `abandon` turns true when the drain grace window expires; a connection
/// whose query is still in flight (or not yet framed) is then answered with
/// `ERROR` without waiting for its worker.
pub async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    dispatcher: Arc<SearchDispatcher>,
    log: QueryLog,
    mut abandon: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = tokio::select! {
        frame = read_frame(&mut stream) => frame,
        _ = abandoned(&mut abandon) => {
            tracing::debug!("Abandoning connection from {} during drain", peer);
            write_response(&mut stream, RESPONSE_ERROR).await;
            return;
        }
    };
    let Some(frame) = frame else {
        return;
    };
    let query = normalize_query(&frame).to_vec();
    let query_len = query.len();

    let dispatched = tokio::select! {
        outcome = dispatcher.dispatch(query) => outcome,
        _ = abandoned(&mut abandon) => {
            tracing::debug!("Abandoning in-flight query from {} during drain", peer);
            write_response(&mut stream, RESPONSE_ERROR).await;
            return;
        }
    };

    let record = match &dispatched {
        Ok(outcome) => QueryRecord {
            ts: now_ms(),
            peer: peer.to_string(),
            mode: dispatcher.mode_label().to_string(),
            algorithm: dispatcher.algorithm_label().to_string(),
            query_len,
            matched: outcome.matched,
            elapsed_ns: outcome.elapsed_ns,
            queue_depth: outcome.queue_depth,
            err_kind: outcome.err_kind.map(str::to_string),
        },
        Err(error) => QueryRecord {
            ts: now_ms(),
            peer: peer.to_string(),
            mode: dispatcher.mode_label().to_string(),
            algorithm: dispatcher.algorithm_label().to_string(),
            query_len,
            matched: false,
            elapsed_ns: error.elapsed_ns,
            queue_depth: error.queue_depth,
            err_kind: Some(error.kind.to_string()),
        },
    };

    let response = match dispatched {
        Ok(outcome) if outcome.matched => RESPONSE_EXISTS,
        Ok(_) => RESPONSE_NOT_FOUND,
        Err(_) => RESPONSE_ERROR,
    };

    write_response(&mut stream, response).await;
    log.record(record).await;
}

async fn write_response<S>(stream: &mut S, response: &[u8])
where
    S: AsyncWrite + Unpin,
{
    match tokio::time::timeout(IO_TIMEOUT, stream.write_all(response)).await {
        Ok(Ok(())) => {
            let _ = tokio::time::timeout(IO_TIMEOUT, stream.shutdown()).await;
        }
        Ok(Err(e)) => tracing::debug!("Write failed: {}", e),
        Err(_elapsed) => tracing::debug!("Write timed out after {:?}", IO_TIMEOUT),
    }
}
