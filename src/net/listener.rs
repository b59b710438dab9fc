//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Accept connections with a bounded wait so shutdown is noticed promptly
//! - Enforce the optional max_connections limit via semaphore
//! - Spawn one handler task per accepted connection
//! - Log accept errors without ever leaving the loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tracing::Instrument;

use crate::config::ListenerConfig;
use crate::context::ReceiverContext;
use crate::lifecycle::Shutdown;
use crate::net::connection::{Connection, ConnectionTracker};
use crate::net::handler::handle_connection;
use crate::observability::metrics;

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address. Fatal to startup.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// The bound server socket plus the settings of its accept loop.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    accept_timeout: Duration,
    read_timeout: Duration,
    /// Semaphore to limit concurrent handlers, if configured.
    connection_limit: Option<Arc<Semaphore>>,
    tracker: ConnectionTracker,
}

impl Listener {
    /// Bind to the configured address.
    ///
    /// Failure is returned as-is; callers should treat it as fatal.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address = format!("{}:{}", config.host, config.port);
        let bind_error = |source| ListenerError::Bind {
            address: address.clone(),
            source,
        };

        let inner = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::info!(
            address = %local_addr,
            max_connections = ?config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            accept_timeout: config.accept_timeout(),
            read_timeout: config.read_timeout(),
            connection_limit: config
                .max_connections
                .map(|max| Arc::new(Semaphore::new(max))),
            tracker: ConnectionTracker::new(),
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Handle for counting handlers still running; stays valid after `serve` returns.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run the accept loop until `shutdown` is triggered.
    ///
    /// The listening socket is closed when this returns. Handlers already
    /// spawned keep running.
    pub async fn serve(self, ctx: Arc<ReceiverContext>, shutdown: Shutdown) {
        let mut signal = shutdown.subscribe();

        if ctx.is_debug() {
            if shutdown.is_triggered() {
                tracing::warn!("Listener was shut down before it was started");
            } else {
                tracing::info!("Listener started, ready to receive incoming connections");
            }
        }

        while !shutdown.is_triggered() {
            let permit = match &self.connection_limit {
                Some(limit) => {
                    let acquire = Arc::clone(limit).acquire_owned();
                    tokio::select! {
                        _ = signal.recv() => break,
                        permit = acquire => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => break,
                        },
                    }
                }
                None => None,
            };

            let accepted = tokio::select! {
                _ = signal.recv() => break,
                accepted = time::timeout(self.accept_timeout, self.inner.accept()) => accepted,
            };

            match accepted {
                // Nothing arrived within the accept timeout.
                Err(_) => continue,
                Ok(Ok((stream, peer_addr))) => {
                    self.spawn_handler(stream, peer_addr, &ctx, permit);
                }
                Ok(Err(e)) => {
                    if shutdown.is_triggered() {
                        break;
                    }
                    tracing::warn!(
                        error = %e,
                        "Error while waiting for a new incoming client connection"
                    );
                    time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }

        drop(self.inner);
        if ctx.is_debug() {
            tracing::info!("Listener has stopped");
        }
    }

    fn spawn_handler(
        &self,
        stream: TcpStream,
        peer_addr: SocketAddr,
        ctx: &Arc<ReceiverContext>,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        metrics::record_connection_accepted();
        if ctx.is_debug() {
            tracing::info!(peer_addr = %peer_addr, "Accepting new incoming connection");
        }

        // Small writes (the greeting) must go out immediately.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                peer_addr = %peer_addr,
                error = %e,
                "Error while setting up a new incoming client connection"
            );
            metrics::record_connection_failed("setup");
            return;
        }

        let conn = Connection::new(stream, peer_addr, self.read_timeout);
        let guard = self.tracker.track(conn.id);
        let span = tracing::info_span!(
            "connection",
            connection_id = %conn.id,
            peer_addr = %peer_addr
        );
        let ctx = Arc::clone(ctx);

        tokio::spawn(
            async move {
                let _permit = permit;
                let _guard = guard;
                let _ = handle_connection(conn, &ctx).await;
            }
            .instrument(span),
        );
    }
}
