use super::connection::handle_connection;
use crate::config::ServerConfig;
use crate::dispatch::SearchDispatcher;
use crate::error::{Result, ServerError};
use crate::logging::{QueryLog, QueryLogWriter};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpSocket;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

/// Listen backlog requested from the kernel.
const LISTEN_BACKLOG: u32 = 128;

/// Grace window for in-flight connections once draining starts.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on the post-abandon wait before stuck handlers are aborted.
/// Handler socket I/O is bounded by the 10 s inactivity timeout, so this only
/// fires if something is badly wedged.
const FORCED_STOP: Duration = Duration::from_secs(15);

/// Lifecycle states of the supervisor, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    Binding,
    Serving,
    Draining,
    Stopped,
}

/// Owns the listening socket, the dispatcher, the optional TLS acceptor, and
/// the query log; orchestrates startup, the accept loop, and graceful
/// shutdown.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<SearchDispatcher>,
    tls: Option<TlsAcceptor>,
    log: QueryLog,
    log_writer: QueryLogWriter,
    /// Flipped to `true` when the drain grace window expires; handlers answer
    /// any still-unfinished query with `ERROR`. Level-triggered so handlers
    /// that look after the flip still observe it.
    abandon: watch::Sender<bool>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        dispatcher: Arc<SearchDispatcher>,
        tls: Option<TlsAcceptor>,
        log: QueryLog,
        log_writer: QueryLogWriter,
    ) -> Self {
        let (abandon, _) = watch::channel(false);
        Self {
            config,
            dispatcher,
            tls,
            log,
            log_writer,
            abandon,
        }
    }

    /// Runs the full `Init -> Binding -> Serving -> Draining -> Stopped`
    /// lifecycle. Every spawned handler task is joined before this returns,
    /// so the process can exit without cutting a response short.
    pub async fn run(self, bind_ip: IpAddr) -> Result<()> {
        let mut state = ServerState::Init;
        tracing::info!("Supervisor state: {:?}", state);

        state = ServerState::Binding;
        tracing::info!("Supervisor state: {:?}", state);

        let addr = SocketAddr::new(bind_ip, self.config.port);
        let listener = bind_listener(addr)?;
        tracing::info!(
            "Listening on {} ({}, {} mode, algorithm '{}')",
            addr,
            if self.tls.is_some() { "TLS" } else { "plaintext" },
            self.dispatcher.mode_label(),
            self.dispatcher.algorithm_label(),
        );

        state = ServerState::Serving;
        tracing::info!("Supervisor state: {:?}", state);

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|source| ServerError::Signal { source })?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|source| ServerError::Signal { source })?;

        let mut handlers: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("SIGINT received; shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received; shutting down");
                    break;
                }
                // Reap finished handlers so the set does not grow unbounded.
                Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_handler(&mut handlers, stream, peer),
                        Err(e) if is_transient_accept_error(&e) => {
                            tracing::warn!("Accept failed: {}", e);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                        }
                        Err(e) => {
                            // Listener-level failure; drain and stop.
                            tracing::error!("Listener failed: {}; shutting down", e);
                            break;
                        }
                    }
                }
            }
        }

        state = ServerState::Draining;
        tracing::info!("Supervisor state: {:?}", state);
        drop(listener);

        let grace = async {
            while handlers.join_next().await.is_some() {}
        };
        if tokio::time::timeout(DRAIN_GRACE, grace).await.is_err() {
            tracing::warn!(
                "{} connection(s) still active after {:?}; abandoning their queries",
                handlers.len(),
                DRAIN_GRACE
            );
            self.abandon.send_replace(true);

            let forced = async {
                while handlers.join_next().await.is_some() {}
            };
            if tokio::time::timeout(FORCED_STOP, forced).await.is_err() {
                tracing::error!("Aborting {} wedged handler task(s)", handlers.len());
                handlers.abort_all();
                while handlers.join_next().await.is_some() {}
            }
        }

        drop(self.abandon);
        drop(self.log);
        // All handlers are joined, so every log sender is gone; this is a
        // pure drain-and-flush.
        if tokio::time::timeout(Duration::from_secs(2), self.log_writer.shutdown())
            .await
            .is_err()
        {
            tracing::warn!("Query log writer did not stop within 2s");
        }

        state = ServerState::Stopped;
        tracing::info!("Supervisor state: {:?}", state);
        Ok(())
    }

    fn spawn_handler(
        &self,
        handlers: &mut JoinSet<()>,
        stream: tokio::net::TcpStream,
        peer: SocketAddr,
    ) {
        tracing::debug!("Accepted connection from {}", peer);

        let dispatcher = self.dispatcher.clone();
        let log = self.log.clone();
        let abandon = self.abandon.subscribe();
        let tls = self.tls.clone();

        handlers.spawn(async move {
            match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(tls_stream) => {
                        handle_connection(tls_stream, peer, dispatcher, log, abandon).await;
                    }
                    Err(e) => {
                        // A failed handshake drops the connection silently.
                        tracing::debug!("TLS handshake with {} failed: {}", peer, e);
                    }
                },
                None => {
                    handle_connection(stream, peer, dispatcher, log, abandon).await;
                }
            }
            tracing::debug!("Connection with {} closed", peer);
        });
    }
}

/// Errors raised for one misbehaving peer rather than the listener itself.
fn is_transient_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
    )
}

fn bind_listener(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    let bind_err = |source: std::io::Error| ServerError::Bind {
        addr: addr.to_string(),
        source,
    };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4().map_err(bind_err)?,
        SocketAddr::V6(_) => TcpSocket::new_v6().map_err(bind_err)?,
    };
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_err)
}
