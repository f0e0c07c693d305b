//! Connection supervisor.
//!
//! Accepts TCP connections and runs each one on its own task through the
//! shared [`CommandRouter`]. A failing connection never affects the listener
//! or any other connection, except that a fatal error (entropy or key setup)
//! in any connection stops the whole server.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::connection::Connection;
use crate::error::{Result, TetherStreamError};
use crate::heartbeat::HeartbeatGuard;
use crate::router::CommandRouter;

/// Pause after a failed `accept` before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Close a connection that sends no command for this long. `None` waits
    /// forever; a stalled peer then blocks only its own task.
    pub idle_timeout: Option<Duration>,
    /// Log a liveness tick per connection at this interval.
    pub heartbeat_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            idle_timeout: None,
            heartbeat_interval: None,
        }
    }
}

impl ServerConfig {
    /// Default configuration listening on all interfaces at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], port)),
            ..Self::default()
        }
    }
}

/// Bound listener plus the router every accepted connection is served by.
pub struct Server {
    listener: TcpListener,
    router: CommandRouter,
    config: ServerConfig,
    fatal_tx: mpsc::UnboundedSender<TetherStreamError>,
    fatal_rx: mpsc::UnboundedReceiver<TetherStreamError>,
}

impl Server {
    /// Bind the listener. Failure is a [`TetherStreamError::Transport`].
    pub async fn bind(config: ServerConfig, router: CommandRouter) -> Result<Self> {
        let listener = TcpListener::bind(config.bind).await.map_err(|e| {
            TetherStreamError::Transport(format!("failed to bind {}: {e}", config.bind))
        })?;
        info!(bind = %config.bind, commands = ?router.table().keywords(), "server listening");
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        Ok(Self {
            listener,
            router,
            config,
            fatal_tx,
            fatal_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TetherStreamError::Transport(e.to_string()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Accept failures are logged and retried after [`ACCEPT_BACKOFF`].
    /// Connections that are already running are left to finish on their own.
    ///
    /// Returns the first fatal error raised by any connection (see
    /// [`TetherStreamError::is_fatal`]); the server stops accepting at once.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut next_id: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(accepted = next_id, "shutdown requested, no longer accepting");
                    return Ok(());
                }
                Some(fatal) = self.fatal_rx.recv() => {
                    error!(class = fatal.class(), error = %fatal, "fatal error, stopping server");
                    return Err(fatal);
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        next_id += 1;
                        self.spawn_connection(next_id, stream, addr);
                    }
                    Err(e) => accept_failed(&e).await,
                },
            }
        }
    }

    fn spawn_connection(&self, id: u64, stream: TcpStream, addr: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let peer = addr.to_string();
        let conn = Connection::new(stream, peer.clone()).with_idle_timeout(self.config.idle_timeout);
        let router = self.router.clone();
        let heartbeat = self.config.heartbeat_interval.filter(|i| !i.is_zero());
        let fatal_tx = self.fatal_tx.clone();

        info!(connection_id = id, peer = %peer, "connection accepted");
        tokio::spawn(async move {
            let _heartbeat = heartbeat.map(|interval| HeartbeatGuard::spawn(peer.clone(), interval));
            match router.serve_connection(conn).await {
                Ok(()) => info!(connection_id = id, peer = %peer, "connection closed"),
                Err(e) if e.is_fatal() => {
                    error!(connection_id = id, peer = %peer, class = e.class(), error = %e, "fatal connection error");
                    let _ = fatal_tx.send(e);
                }
                Err(e) => warn!(
                    connection_id = id,
                    peer = %peer,
                    class = e.class(),
                    error = %e,
                    "connection terminated"
                ),
            }
        });
    }
}

/// Log a failed `accept` and back off so a persistent failure (e.g. out of
/// file descriptors) does not spin the accept loop.
async fn accept_failed(err: &std::io::Error) {
    error!(error = %err, class = "transport", "accept failed");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::CommandTable;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), 8000);
        assert!(config.idle_timeout.is_none());
        assert!(config.heartbeat_interval.is_none());
        assert_eq!(ServerConfig::with_port(9100).bind.port(), 9100);
    }

    #[tokio::test]
    async fn bind_conflict_is_transport_error() {
        let first = Server::bind(
            ServerConfig {
                bind: "127.0.0.1:0".parse().unwrap(),
                ..ServerConfig::default()
            },
            CommandRouter::new(CommandTable::new()),
        )
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let err = Server::bind(
            ServerConfig {
                bind: taken,
                ..ServerConfig::default()
            },
            CommandRouter::new(CommandTable::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TetherStreamError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn accept_failure_backs_off() {
        let start = tokio::time::Instant::now();
        let err = std::io::Error::new(std::io::ErrorKind::Other, "too many open files");
        accept_failed(&err).await;
        assert!(start.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn shutdown_stops_accept_loop() {
        let server = Server::bind(
            ServerConfig {
                bind: "127.0.0.1:0".parse().unwrap(),
                ..ServerConfig::default()
            },
            CommandRouter::new(CommandTable::new()),
        )
        .await
        .unwrap();
        server.run_until(async {}).await.unwrap();
    }
}
